// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Configuration and logging (§6, §8 ambient stack).

pub mod config;
pub mod logger;

pub use config::{Config, ConsumerConfig, ProviderConfig, Redundancy, RuntimeConfig, SafetyIdentity};
