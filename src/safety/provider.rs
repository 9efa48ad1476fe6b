// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Provider state machine (§4.3.4).

use tracing::{debug, warn};

use super::common::{Flags, crc_canonical_input};
use crate::{
    codec::{RequestSpdu, Registry, ResponseSpdu},
    crc::SharedCrc,
    error::{Error, Result},
};

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub spdu_id: (u32, u32, u32),
    pub safety_provider_level: u8,
}

/// Application-populated inputs for one provider cycle (§6 SAPI).
#[derive(Debug, Clone, Default)]
pub struct ProviderInputSapi {
    pub app_done: bool,
    pub safe_data: Vec<u8>,
    pub non_safe_data: Vec<u8>,
    pub data_valid: bool,
    pub comm_error: bool,
    pub test_mode: bool,
    pub operator_ack: bool,
}

/// Published flags, surfaced to the application after each cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderOutputSapi {
    pub flags: Flags,
    pub published: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Init,
    Running,
}

/// One provider instance. Owns nothing but its own working state — the
/// `RequestSpdu`/`ResponseSpdu` records it reads and writes live in the
/// shared [`Registry`], keyed by `numeric_id`.
#[derive(Debug)]
pub struct Provider {
    pub numeric_id: u32,
    pub config: ProviderConfig,
    pub state: ProviderState,
    most_recent_request: Option<RequestSpdu>,
    crc: SharedCrc,
}

impl Provider {
    pub fn new(numeric_id: u32, config: ProviderConfig, crc: SharedCrc) -> Self {
        Self { numeric_id, config, state: ProviderState::Init, most_recent_request: None, crc }
    }

    /// `init → running`, invoked once by `Mapper::start_safety`.
    pub fn start(&mut self) {
        self.state = ProviderState::Running;
    }

    /// One cycle (§4.3.4 steps 1–5). `comm_done` tells the provider a fresh
    /// RequestSPDU was retrieved into the registry this cycle. Returns
    /// `Ok(true)` if a response was published, `Ok(false)` on the *no-data*
    /// path (`appDone` false — the mapper does not publish this cycle and
    /// the previous response stays in the cache).
    pub fn cycle(
        &mut self,
        registry: &Registry,
        input: &ProviderInputSapi,
        output: &mut ProviderOutputSapi,
        comm_done: bool,
    ) -> Result<bool> {
        if self.state != ProviderState::Running {
            return Err(Error::InvalidState("provider cycle called before start".into()));
        }

        if !input.app_done {
            output.published = false;
            debug!(numeric_id = self.numeric_id, "provider cycle: no app data, skipping publish");
            return Ok(false);
        }

        if comm_done {
            match registry.get_request(self.numeric_id) {
                Ok(req) => self.most_recent_request = Some(req),
                Err(Error::NotFound) => {},
                Err(e) => return Err(e),
            }
        }

        // No request has ever arrived: there is no consumerId/MNR to echo,
        // so there is nothing safe to address a response to. Same no-data
        // path as `!appDone` above.
        let Some(req) = &self.most_recent_request else {
            output.published = false;
            debug!(numeric_id = self.numeric_id, "provider cycle: no request seen yet, skipping publish");
            return Ok(false);
        };
        let (consumer_id, mnr) = (req.safety_consumer_id.get(), req.monitoring_number.get());

        let mut flags = Flags::empty();
        if input.comm_error {
            flags |= Flags::COMM_ERROR;
        }
        if input.test_mode {
            flags |= Flags::TEST_MODE_ACTIVATED;
        }
        if input.operator_ack {
            flags |= Flags::OPERATOR_ACK_PROVIDER;
        }
        if !input.data_valid {
            flags |= Flags::FSV_ACTIVATED;
            warn!(numeric_id = self.numeric_id, "provider has no valid data this cycle");
        }

        let safe_data = if input.data_valid {
            input.safe_data.clone()
        } else {
            vec![0u8; input.safe_data.len()]
        };

        let crc_input = crc_canonical_input(
            &safe_data,
            &input.non_safe_data,
            self.config.spdu_id,
            consumer_id,
            mnr,
            flags.bits(),
            self.config.safety_provider_level,
        );
        let crc = self.crc.checksum(&crc_input);

        let response = ResponseSpdu {
            safe_data: safe_data.into(),
            non_safe_data: input.non_safe_data.clone().into(),
            flags: flags.bits(),
            spdu_id: self.config.spdu_id,
            safety_consumer_id: consumer_id,
            monitoring_number: mnr,
            crc,
        };

        registry.set_response(self.numeric_id, response)?;
        output.flags = flags;
        output.published = true;
        Ok(true)
    }
}
