// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level configuration document (§6): the provider and consumer
/// instances a process hosts, plus the runtime knobs that sit outside the
/// protocol (cycle period, bridge addresses).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub consumers: Vec<ConsumerConfig>,
    pub runtime: RuntimeConfig,
}

/// `safetyBaseId` / `safetyProviderId` identity pair (§3); config-surface
/// only, not part of any wire field or invariant.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SafetyIdentity {
    #[serde(rename = "SafetyBaseId")]
    pub safety_base_id: Uuid,
    #[serde(rename = "SafetyProviderId")]
    pub safety_provider_id: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProviderConfig {
    #[serde(rename = "NumericId")]
    pub numeric_id: u32,
    #[serde(rename = "SafetyProviderLevel")]
    pub safety_provider_level: u8,
    #[serde(rename = "SpduId")]
    pub spdu_id: (u32, u32, u32),
    #[serde(rename = "Identity")]
    pub identity: SafetyIdentity,
    #[serde(rename = "SafetyDataLength")]
    pub safety_data_length: u16,
    #[serde(rename = "NonSafetyDataLength")]
    pub non_safety_data_length: u16,
}

/// §4.3.6 redundancy mode. `Dual` parses but is rejected by
/// `uam::Mapper::init_safety_consumer` (DESIGN.md Open Question log).
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Redundancy {
    Single,
    Dual,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ConsumerConfig {
    #[serde(rename = "NumericId")]
    pub numeric_id: u32,
    #[serde(rename = "SafetyProviderLevel")]
    pub safety_provider_level: u8,
    #[serde(rename = "SpduId")]
    pub spdu_id: (u32, u32, u32),
    #[serde(rename = "Identity")]
    pub identity: SafetyIdentity,
    #[serde(rename = "SafetyConsumerId")]
    pub safety_consumer_id: u32,
    #[serde(rename = "SafetyConsumerTimeout")]
    pub safety_consumer_timeout_ms: u32,
    #[serde(rename = "SafetyErrorIntervalLimit")]
    pub safety_error_interval_limit_ms: u32,
    #[serde(rename = "SafetyDataLength")]
    pub safety_data_length: u16,
    #[serde(rename = "NonSafetyDataLength")]
    pub non_safety_data_length: u16,
    #[serde(rename = "Redundancy")]
    pub redundancy: Redundancy,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RuntimeConfig {
    #[serde(rename = "CyclePeriodMs")]
    pub cycle_period_ms: u32,
    #[serde(rename = "BridgeBindAddr")]
    pub bridge_bind_addr: String,
    #[serde(rename = "BridgePeerAddr")]
    pub bridge_peer_addr: String,
}

impl Config {
    /// Loads and validates the configuration document (§6). The XML
    /// topic/dataset binding loader stays out of scope; this only covers
    /// the options enumerated in §6.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.as_ref().display()))?;
        let mut cfg: Config = serde_yaml::from_str(&raw).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.providers.is_empty() || !self.consumers.is_empty(),
            "configuration declares no provider and no consumer instances"
        );
        for p in &self.providers {
            ensure!(p.safety_provider_level <= 3, "safetyProviderLevel must be 0..=3");
        }
        for c in &self.consumers {
            ensure!(c.safety_provider_level <= 3, "safetyProviderLevel must be 0..=3");
        }
        ensure!(self.runtime.cycle_period_ms > 0, "CyclePeriodMs must be > 0");
        Ok(())
    }
}

impl ProviderConfig {
    pub fn to_safety_config(&self) -> crate::safety::ProviderConfig {
        crate::safety::ProviderConfig {
            spdu_id: self.spdu_id,
            safety_provider_level: self.safety_provider_level,
        }
    }
}

impl ConsumerConfig {
    pub fn to_safety_config(&self) -> crate::safety::ConsumerConfig {
        crate::safety::ConsumerConfig {
            spdu_id: self.spdu_id,
            safety_provider_level: self.safety_provider_level,
            safety_consumer_id: self.safety_consumer_id,
            safety_consumer_timeout_ms: self.safety_consumer_timeout_ms,
            safety_data_length: self.safety_data_length as usize,
            non_safety_data_length: self.non_safety_data_length as usize,
        }
    }
}
