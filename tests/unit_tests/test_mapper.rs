// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use spdu_safety_mapper::{
    cfg::{Redundancy, SafetyIdentity},
    codec::{Registry, ResponseLengths},
    crc::Crc32IsoHdlc,
    safety::{ConsumerConfig, ConsumerOutcome, ProviderConfig},
    uam::Mapper,
};
use uuid::Uuid;

fn test_identity(numeric_id: u32) -> SafetyIdentity {
    SafetyIdentity { safety_base_id: Uuid::nil(), safety_provider_id: numeric_id }
}

/// A provider and a consumer sharing one numeric id and one `Registry`
/// (as they would inside a single process) reach `Accepted` within a few
/// cycles once the application side enables the consumer and supplies
/// provider data.
#[test]
fn provider_and_consumer_converge_to_accepted() {
    let registry = Arc::new(Registry::new());
    let mut mapper = Mapper::new(Arc::clone(&registry));
    mapper.initialise().unwrap();

    let numeric_id = 42;
    let crc = Arc::new(Crc32IsoHdlc::new());

    let provider_handle = mapper
        .init_safety_provider(
            numeric_id,
            ProviderConfig { spdu_id: (1, 2, 3), safety_provider_level: 1 },
            test_identity(numeric_id),
            ResponseLengths { n_s: 2, n_ns: 0 },
            Arc::clone(&crc),
            Box::new(|input, _| {
                input.app_done = true;
                input.data_valid = true;
                input.safe_data = vec![0xaa, 0xbb];
            }),
        )
        .unwrap();

    let consumer_handle = mapper
        .init_safety_consumer(
            numeric_id,
            ConsumerConfig {
                spdu_id: (1, 2, 3),
                safety_provider_level: 1,
                safety_consumer_id: 7,
                safety_consumer_timeout_ms: 5_000,
                safety_data_length: 2,
                non_safety_data_length: 0,
            },
            test_identity(numeric_id),
            Redundancy::Single,
            ResponseLengths { n_s: 2, n_ns: 0 },
            Arc::clone(&crc),
            Box::new(|input, _| input.enable = true),
        )
        .unwrap();

    mapper.start_safety().unwrap();

    let mut last_outcome = None;
    for cycle in 0..4u64 {
        mapper.mark_provider_comm_done(provider_handle);
        mapper.mark_consumer_comm_done(consumer_handle);
        let report = mapper.cycle(cycle * 10).unwrap();
        last_outcome = report.consumers.first().map(|c| c.outcome.clone());
    }

    assert_eq!(last_outcome, Some(ConsumerOutcome::Accepted));
}

#[test]
fn disabled_consumer_never_accepts() {
    let registry = Arc::new(Registry::new());
    let mut mapper = Mapper::new(Arc::clone(&registry));
    mapper.initialise().unwrap();

    let crc = Arc::new(Crc32IsoHdlc::new());
    let consumer_handle = mapper
        .init_safety_consumer(
            1,
            ConsumerConfig {
                spdu_id: (1, 2, 3),
                safety_provider_level: 0,
                safety_consumer_id: 7,
                safety_consumer_timeout_ms: 1_000,
                safety_data_length: 1,
                non_safety_data_length: 0,
            },
            test_identity(1),
            Redundancy::Single,
            ResponseLengths { n_s: 1, n_ns: 0 },
            crc,
            Box::new(|_, _| {}),
        )
        .unwrap();
    mapper.start_safety().unwrap();

    mapper.mark_consumer_comm_done(consumer_handle);
    let report = mapper.cycle(0).unwrap();
    assert_eq!(report.consumers[0].outcome, ConsumerOutcome::NotEnabled);
}
