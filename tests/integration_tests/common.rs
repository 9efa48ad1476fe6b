// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use spdu_safety_mapper::{
    bridge::{NsBridge, test_support::LossyBridge},
    cfg::{Redundancy, SafetyIdentity},
    codec::{ExtensionObject, Registry, ResponseLengths},
    crc::Crc32IsoHdlc,
    safety::{ConsumerConfig, ConsumerOutcome, ProviderConfig},
    uam::{ConsumerHandle, Mapper, ProviderHandle},
};
use uuid::Uuid;

fn test_identity(numeric_id: u32) -> SafetyIdentity {
    SafetyIdentity { safety_base_id: Uuid::nil(), safety_provider_id: numeric_id }
}

pub const SPDU_ID: (u32, u32, u32) = (0x1111_1111, 0x2222_2222, 0x3333_3333);
pub const N_S: usize = 27;
pub const N_NS: usize = 30;
pub const PROVIDER_LEVEL: u8 = 3;

fn tagged(type_tag: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&type_tag.to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn pump_into(bridge: &mut LossyBridge, registry: &Registry, numeric_id: u32) {
    while let Some(datagram) = bridge.receive_spdu().unwrap() {
        if datagram.len() < 4 {
            continue;
        }
        let tag = u32::from_le_bytes(datagram[..4].try_into().unwrap());
        let body = &datagram[4..];
        match ExtensionObject::decode(tag, body) {
            Ok(ExtensionObject::Request(req)) => registry.set_request(numeric_id, req),
            Ok(ExtensionObject::Response(resp)) => {
                // A scenario may corrupt bytes enough to also corrupt the
                // declared bytestring lengths; `set_response`'s length check
                // then rejects it before it ever reaches the consumer state
                // machine. That is an acceptable way for a corrupted
                // datagram to be refused — the state machine never has to
                // see it to stay safe.
                let _ = registry.set_response(numeric_id, resp);
            },
            Err(_) => {},
        }
    }
}

/// One provider instance wired to its own side of a [`LossyBridge`] link.
pub struct ProviderSide {
    pub mapper: Mapper,
    pub registry: Arc<Registry>,
    pub handle: ProviderHandle,
    pub numeric_id: u32,
    pub bridge: LossyBridge,
}

impl ProviderSide {
    pub fn new(numeric_id: u32, bridge: LossyBridge, safe_data: Vec<u8>) -> Self {
        let registry = Arc::new(Registry::new());
        let mut mapper = Mapper::new(Arc::clone(&registry));
        mapper.initialise().unwrap();
        let handle = mapper
            .init_safety_provider(
                numeric_id,
                ProviderConfig { spdu_id: SPDU_ID, safety_provider_level: PROVIDER_LEVEL },
                test_identity(numeric_id),
                ResponseLengths { n_s: N_S, n_ns: N_NS },
                Arc::new(Crc32IsoHdlc::new()),
                Box::new(move |input, _| {
                    input.app_done = true;
                    input.data_valid = true;
                    input.safe_data = safe_data.clone();
                    input.non_safe_data = vec![0u8; N_NS];
                }),
            )
            .unwrap();
        mapper.start_safety().unwrap();
        Self { mapper, registry, handle, numeric_id, bridge }
    }

    /// Runs one cycle: absorbs any inbound request, publishes a response,
    /// forwards it to the bridge.
    pub fn step(&mut self, now_ms: u64) {
        pump_into(&mut self.bridge, &self.registry, self.numeric_id);
        self.mapper.mark_provider_comm_done(self.handle);
        let report = self.mapper.cycle(now_ms).unwrap();
        if report.providers[0].published
            && let Ok(response) = self.registry.get_response(self.numeric_id)
        {
            let bytes = tagged(ExtensionObject::Response(response.clone()).type_tag(), &response.encode());
            self.bridge.send_spdu(&bytes).unwrap();
        }
    }
}

/// One consumer instance wired to its own side of a [`LossyBridge`] link.
pub struct ConsumerSide {
    pub mapper: Mapper,
    pub registry: Arc<Registry>,
    pub handle: ConsumerHandle,
    pub numeric_id: u32,
    pub bridge: LossyBridge,
}

impl ConsumerSide {
    pub fn new(numeric_id: u32, safety_consumer_id: u32, timeout_ms: u32, bridge: LossyBridge) -> Self {
        let registry = Arc::new(Registry::new());
        let mut mapper = Mapper::new(Arc::clone(&registry));
        mapper.initialise().unwrap();
        let handle = mapper
            .init_safety_consumer(
                numeric_id,
                ConsumerConfig {
                    spdu_id: SPDU_ID,
                    safety_provider_level: PROVIDER_LEVEL,
                    safety_consumer_id,
                    safety_consumer_timeout_ms: timeout_ms,
                    safety_data_length: N_S,
                    non_safety_data_length: N_NS,
                },
                test_identity(numeric_id),
                Redundancy::Single,
                ResponseLengths { n_s: N_S, n_ns: N_NS },
                Arc::new(Crc32IsoHdlc::new()),
                Box::new(|input, _| input.enable = true),
            )
            .unwrap();
        mapper.start_safety().unwrap();
        Self { mapper, registry, handle, numeric_id, bridge }
    }

    /// Runs one cycle: absorbs any inbound response, runs the state
    /// machine, forwards the fresh request to the bridge. Returns this
    /// cycle's outcome.
    pub fn step(&mut self, now_ms: u64) -> ConsumerOutcome {
        pump_into(&mut self.bridge, &self.registry, self.numeric_id);
        self.mapper.mark_consumer_comm_done(self.handle);
        let report = self.mapper.cycle(now_ms).unwrap();
        if let Ok(request) = self.registry.get_request(self.numeric_id) {
            let bytes = tagged(ExtensionObject::Request(request.clone()).type_tag(), &request.to_bytes());
            self.bridge.send_spdu(&bytes).unwrap();
        }
        report.consumers[0].outcome.clone()
    }
}

pub fn safe_data_fixture() -> Vec<u8> {
    (1..=N_S as u8).collect()
}
