// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A safety-aware publish/subscribe SPDU mapping layer implementing an
//! OPC UA PubSub black-channel safety pattern: the protocol (`safety`,
//! `codec`) treats its carrying transport as potentially faulty and relies
//! entirely on its own CRCs, monitoring numbers, and timeouts to detect
//! corruption, loss, delay, duplication, repetition, insertion,
//! masquerade, and misrouting.

pub mod bridge;
pub mod cache;
pub mod cfg;
pub mod codec;
pub mod crc;
pub mod error;
pub mod safety;
pub mod uam;

pub use error::{Error, Result};
