// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Consumer state machine (§4.3.5): MNR tie-break, the six-point response
//! validation, and fail-safe activation.

use tracing::{debug, info, warn};

use super::common::{Flags, crc_canonical_input, next_mnr};
use crate::{
    codec::{RequestSpdu, Registry},
    crc::SharedCrc,
    error::{Error, Result},
};

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub spdu_id: (u32, u32, u32),
    pub safety_provider_level: u8,
    pub safety_consumer_id: u32,
    pub safety_consumer_timeout_ms: u32,
    pub safety_data_length: usize,
    pub non_safety_data_length: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConsumerInputSapi {
    pub enable: bool,
    pub comm_error: bool,
    pub operator_ack_requested: bool,
    pub operator_ack_consumer: bool,
}

#[derive(Debug, Clone)]
pub struct ConsumerOutputSapi {
    pub safe_data: Vec<u8>,
    pub non_safe_data: Vec<u8>,
    pub fsv_activated: bool,
    pub flags: Flags,
}

impl ConsumerOutputSapi {
    /// Invariant 7: while not `Valid`, every byte of `safeData` is zero and
    /// `bFsvActivated` is raised.
    pub fn fail_safe(n_s: usize, n_ns: usize) -> Self {
        Self { safe_data: vec![0u8; n_s], non_safe_data: vec![0u8; n_ns], fsv_activated: true, flags: Flags::empty() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Init,
    Activating,
    Valid,
    Fault,
    Closed,
}

/// What happened during one cycle's response handling, for diagnostics and
/// tests — never propagated to the application as an error except
/// `Fault`'s inner reason, which the application sees only via
/// `ConsumerOutputSapi::fsv_activated` (§7: faults never cross the cycle
/// boundary as thrown errors).
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerOutcome {
    NotEnabled,
    NoResponse,
    /// Response echoed an MNR already consumed; dropped silently (§7
    /// `mnr-stale`, §8 S4).
    Stale(u32),
    Accepted,
    Fault(Error),
}

#[derive(Debug)]
pub struct Consumer {
    pub numeric_id: u32,
    pub config: ConsumerConfig,
    pub state: ConsumerState,
    /// MNR of the request most recently *published*; becomes next cycle's
    /// acceptable MNR (the tie-break of §4.3.5).
    published_mnr: u32,
    last_accepted_mnr: Option<u32>,
    last_accepted_time: Option<u64>,
    fault_counter: u32,
    crc: SharedCrc,
}

impl Consumer {
    pub fn new(numeric_id: u32, config: ConsumerConfig, crc: SharedCrc) -> Self {
        Self {
            numeric_id,
            config,
            state: ConsumerState::Init,
            published_mnr: 0,
            last_accepted_mnr: None,
            last_accepted_time: None,
            fault_counter: 0,
            crc,
        }
    }

    pub fn stop(&mut self) {
        self.state = ConsumerState::Closed;
    }

    pub fn fault_count(&self) -> u32 {
        self.fault_counter
    }

    /// One cycle (§4.3.5 steps 1–5). `comm_done` tells the consumer a fresh
    /// ResponseSPDU was retrieved into the registry this cycle. `now_ms` is
    /// the monotonic clock reading for the timeout/freshness checks.
    pub fn cycle(
        &mut self,
        registry: &Registry,
        input: &ConsumerInputSapi,
        output: &mut ConsumerOutputSapi,
        comm_done: bool,
        now_ms: u64,
    ) -> Result<ConsumerOutcome> {
        if self.state == ConsumerState::Closed {
            return Err(Error::InvalidState("consumer is closed".into()));
        }

        if self.state == ConsumerState::Fault && input.operator_ack_consumer {
            info!(numeric_id = self.numeric_id, "operator ack received, retrying activation");
            self.state = ConsumerState::Activating;
        }

        if self.state == ConsumerState::Init {
            if input.enable {
                self.state = ConsumerState::Activating;
            } else {
                return Ok(ConsumerOutcome::NotEnabled);
            }
        }

        // Step 1: MNR tie-break — the acceptable MNR this cycle is the one
        // published *last* cycle, not the one we are about to write.
        let acceptable_mnr = self.published_mnr;
        let mnr_next = next_mnr(self.published_mnr);

        // Steps 2-3: build and write the request.
        let mut req_flags = Flags::empty();
        if input.comm_error {
            req_flags |= Flags::COMM_ERROR;
        }
        if input.operator_ack_requested {
            req_flags |= Flags::OPERATOR_ACK_REQUESTED;
        }
        registry.set_request(
            self.numeric_id,
            RequestSpdu::new(self.config.safety_consumer_id, mnr_next, req_flags.bits()),
        );
        self.published_mnr = mnr_next;

        // Step 4: validate the latest response, if one arrived this cycle.
        if comm_done {
            match registry.get_response(self.numeric_id) {
                Ok(resp) => self.validate_and_apply(&resp, acceptable_mnr, output, now_ms),
                Err(Error::NotFound) => self.maybe_timeout(output, now_ms),
                Err(e) => Err(e),
            }
        } else {
            self.maybe_timeout(output, now_ms)
        }
    }

    fn validate_and_apply(
        &mut self,
        resp: &crate::codec::ResponseSpdu,
        acceptable_mnr: u32,
        output: &mut ConsumerOutputSapi,
        now_ms: u64,
    ) -> Result<ConsumerOutcome> {
        // b. spduId
        if resp.spdu_id != self.config.spdu_id {
            return self.enter_fault(
                output,
                Error::SpduIdMismatch { expected: self.config.spdu_id, got: resp.spdu_id },
            );
        }
        // c. consumerId
        if resp.safety_consumer_id != self.config.safety_consumer_id {
            return self.enter_fault(
                output,
                Error::ConsumerIdMismatch {
                    expected: self.config.safety_consumer_id,
                    got: resp.safety_consumer_id,
                },
            );
        }
        // d. MNR: any response bearing an MNR at or below the last one
        // accepted is a replay of an already-retired cycle, dropped
        // silently (no fault, no state change) regardless of how many
        // cycles back it was consumed; anything else that does not match
        // the acceptable MNR is a genuine mismatch.
        if resp.monitoring_number != acceptable_mnr {
            let already_retired =
                self.last_accepted_mnr.is_some_and(|last| resp.monitoring_number <= last);
            if already_retired {
                let reason = Error::MnrStale(resp.monitoring_number);
                debug!(numeric_id = self.numeric_id, error = %reason, "dropping stale response");
                return Ok(ConsumerOutcome::Stale(resp.monitoring_number));
            }
            return self.enter_fault(
                output,
                Error::MnrMismatch { expected: acceptable_mnr, got: resp.monitoring_number },
            );
        }
        // e. CRC
        let crc_input = crc_canonical_input(
            &resp.safe_data,
            &resp.non_safe_data,
            resp.spdu_id,
            resp.safety_consumer_id,
            resp.monitoring_number,
            resp.flags,
            self.config.safety_provider_level,
        );
        let recomputed = self.crc.checksum(&crc_input);
        if recomputed != resp.crc {
            return self.enter_fault(output, Error::CrcError { recomputed, received: resp.crc });
        }
        // f. freshness: age of the last accepted response against the
        // timeout budget (§4.3.5, §8 boundary: timeout=0 faults every cycle
        // that lacks a brand-new acceptance).
        if let Some(last) = self.last_accepted_time {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed > self.config.safety_consumer_timeout_ms as u64 {
                return self.enter_fault(output, Error::Timeout(self.config.safety_consumer_timeout_ms));
            }
        }
        // g. explicit fail-safe request from the provider (§8 S6).
        let flags = Flags::from_bits_truncate(resp.flags);
        if flags.contains(Flags::ACTIVATE_FSV) || flags.contains(Flags::FSV_ACTIVATED) {
            return self.enter_fault(
                output,
                Error::InvalidState("provider requested fail-safe activation".into()),
            );
        }

        // Fault never promotes straight to Valid here: recovery requires
        // operator ack first (handled at the top of `cycle`, which moves
        // Fault to Activating before this validation runs). A response
        // that otherwise passes every check still must not be accepted
        // while the ack is pending — Invariant 7 holds for every cycle the
        // state is not Activating/Valid, not just the ones that fail
        // validation.
        if !matches!(self.state, ConsumerState::Activating | ConsumerState::Valid) {
            return self.enter_fault(
                output,
                Error::InvalidState("valid response received while awaiting operator acknowledgement".into()),
            );
        }

        output.safe_data.clear();
        output.safe_data.extend_from_slice(&resp.safe_data);
        output.non_safe_data.clear();
        output.non_safe_data.extend_from_slice(&resp.non_safe_data);
        output.fsv_activated = false;
        output.flags = flags;

        self.last_accepted_time = Some(now_ms);
        self.last_accepted_mnr = Some(resp.monitoring_number);
        self.fault_counter = 0;

        if self.state == ConsumerState::Activating {
            self.state = ConsumerState::Valid;
        }
        Ok(ConsumerOutcome::Accepted)
    }

    fn maybe_timeout(&mut self, output: &mut ConsumerOutputSapi, now_ms: u64) -> Result<ConsumerOutcome> {
        if self.state != ConsumerState::Valid {
            return Ok(ConsumerOutcome::NoResponse);
        }
        let elapsed = match self.last_accepted_time {
            Some(last) => now_ms.saturating_sub(last),
            None => u64::MAX,
        };
        if elapsed > self.config.safety_consumer_timeout_ms as u64 {
            return self.enter_fault(output, Error::Timeout(self.config.safety_consumer_timeout_ms));
        }
        Ok(ConsumerOutcome::NoResponse)
    }

    fn enter_fault(&mut self, output: &mut ConsumerOutputSapi, reason: Error) -> Result<ConsumerOutcome> {
        warn!(numeric_id = self.numeric_id, error = %reason, "consumer entering fault");
        self.fault_counter += 1;
        *output = ConsumerOutputSapi::fail_safe(self.config.safety_data_length, self.config.non_safety_data_length);
        self.state = ConsumerState::Fault;
        Ok(ConsumerOutcome::Fault(reason))
    }
}
