// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The UAM mapping layer (§4.4): registers provider/consumer instances and
//! drives them through one cycle at a time.

pub mod mapper;

pub use mapper::{
    ConsumerAppCycle, ConsumerCycleResult, ConsumerHandle, CycleReport, Mapper,
    ProviderAppCycle, ProviderCycleResult, ProviderHandle, MAX_INSTANCES,
};
