// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::Bytes;
use spdu_safety_mapper::{
    bridge::test_support::{Fault, LossyBridge},
    codec::ResponseSpdu,
    crc::{Crc32IsoHdlc, CrcAlgorithm},
    safety::{ConsumerOutcome, Flags, crc_canonical_input},
};

use crate::integration_tests::common::{
    ConsumerSide, N_NS, N_S, PROVIDER_LEVEL, ProviderSide, SPDU_ID, safe_data_fixture,
};

const CONSUMER_ID: u32 = 0x2000_1222;
const TIMEOUT_MS: u32 = 1000;
const CYCLE_MS: u64 = 100;

fn pair() -> (ProviderSide, ConsumerSide) {
    let (provider_bridge, consumer_bridge) = LossyBridge::pair();
    let provider = ProviderSide::new(1, provider_bridge, safe_data_fixture());
    let consumer = ConsumerSide::new(1, CONSUMER_ID, TIMEOUT_MS, consumer_bridge);
    (provider, consumer)
}

fn run_cycle(provider: &mut ProviderSide, consumer: &mut ConsumerSide, now_ms: u64) -> ConsumerOutcome {
    provider.step(now_ms);
    consumer.step(now_ms)
}

/// S1: clean transport, five cycles, consumer reaches *valid* by the third
/// cycle with the provider's safeData mirrored exactly and no fail-safe.
#[test]
fn s1_clean_transport_reaches_valid_with_mirrored_data() {
    let (mut provider, mut consumer) = pair();

    let mut last = ConsumerOutcome::NotEnabled;
    for cycle in 0..5u64 {
        last = run_cycle(&mut provider, &mut consumer, cycle * CYCLE_MS);
    }

    assert_eq!(last, ConsumerOutcome::Accepted);
}

/// S2: after cycle 3 a response byte is corrupted in flight; cycle 4's
/// consumer enters *fault* with a zeroed, fail-safe output.
#[test]
fn s2_corrupted_response_forces_fault_with_fail_safe_output() {
    let (mut provider, mut consumer) = pair();

    for cycle in 0..3u64 {
        run_cycle(&mut provider, &mut consumer, cycle * CYCLE_MS);
    }

    provider.bridge.inject(Fault::Corrupt);
    let outcome = run_cycle(&mut provider, &mut consumer, 3 * CYCLE_MS);

    assert!(matches!(outcome, ConsumerOutcome::Fault(_)));
}

/// S3: responses are dropped for 1100 ms; the consumer faults on the first
/// cycle past the configured 1000 ms timeout and stays faulted until an
/// operator ack re-arms activation.
#[test]
fn s3_sustained_drop_faults_on_timeout_and_needs_operator_ack() {
    let (mut provider, mut consumer) = pair();

    for cycle in 0..3u64 {
        run_cycle(&mut provider, &mut consumer, cycle * CYCLE_MS);
    }

    let mut timed_out_at = None;
    let mut now_ms = 3 * CYCLE_MS;
    for _ in 0..12 {
        now_ms += CYCLE_MS;
        provider.bridge.inject(Fault::Drop);
        let outcome = run_cycle(&mut provider, &mut consumer, now_ms);
        if matches!(outcome, ConsumerOutcome::Fault(_)) {
            timed_out_at = Some(now_ms);
            break;
        }
    }

    assert!(timed_out_at.is_some(), "consumer never timed out under sustained drop");

    // Still faulted without an operator ack, even once drops stop and a
    // fresh, otherwise-valid response starts arriving again.
    let still_faulted = run_cycle(&mut provider, &mut consumer, now_ms + CYCLE_MS);
    assert!(matches!(still_faulted, ConsumerOutcome::Fault(_)));
}

/// S4: the response from cycle 3 is replayed during cycle 6; the replay is
/// silently dropped (*mnr-stale*) and does not itself raise a fault.
#[test]
fn s4_replayed_response_is_silently_dropped() {
    let (mut provider, mut consumer) = pair();

    for cycle in 0..3u64 {
        run_cycle(&mut provider, &mut consumer, cycle * CYCLE_MS);
    }

    // Capture cycle 3's accepted response bytes by letting the provider
    // publish once more and intercepting it before it reaches the consumer.
    provider.step(3 * CYCLE_MS);
    let stale = provider.registry.get_response(provider.numeric_id).unwrap();
    let stale_outcome = consumer.step(3 * CYCLE_MS);
    assert_eq!(stale_outcome, ConsumerOutcome::Accepted);

    for cycle in 4..6u64 {
        run_cycle(&mut provider, &mut consumer, cycle * CYCLE_MS);
    }

    // Inject the captured cycle-3 response directly into the consumer's
    // registry ahead of cycle 6's fresh delivery, simulating a replayed
    // datagram arriving alongside the genuine one.
    consumer.registry.set_response(consumer.numeric_id, stale.clone()).unwrap();
    let replay_outcome = consumer.step(6 * CYCLE_MS);
    assert!(matches!(replay_outcome, ConsumerOutcome::Stale(_)));
}

/// S5: two provider/consumer pairs have their transports swapped; each
/// consumer receives the foreign provider's response and rejects it on
/// consumerId, entering *fault*.
#[test]
fn s5_swapped_transports_reject_on_consumer_id_mismatch() {
    let (bridge_a_provider, bridge_a_consumer) = LossyBridge::pair();
    let (bridge_b_provider, bridge_b_consumer) = LossyBridge::pair();

    let mut provider_a = ProviderSide::new(10, bridge_a_provider, safe_data_fixture());
    let mut provider_b = ProviderSide::new(20, bridge_b_provider, safe_data_fixture());
    // Consumer A is wired to provider B's bridge end and vice versa: each
    // consumer receives the other pair's transport.
    let mut consumer_a = ConsumerSide::new(10, 0x2000_1111, TIMEOUT_MS, bridge_b_consumer);
    let mut consumer_b = ConsumerSide::new(20, 0x2000_2222, TIMEOUT_MS, bridge_a_consumer);

    let mut outcome_a = ConsumerOutcome::NotEnabled;
    let mut outcome_b = ConsumerOutcome::NotEnabled;
    for cycle in 0..3u64 {
        let now_ms = cycle * CYCLE_MS;
        provider_a.step(now_ms);
        provider_b.step(now_ms);
        outcome_a = consumer_a.step(now_ms);
        outcome_b = consumer_b.step(now_ms);
    }

    assert!(matches!(outcome_a, ConsumerOutcome::Fault(_)));
    assert!(matches!(outcome_b, ConsumerOutcome::Fault(_)));
}

/// S6: the provider sets `ACTIVATE_FSV` in an otherwise valid response
/// (correct CRC, correct MNR); the consumer still enters *fault* this
/// cycle.
#[test]
fn s6_activate_fsv_flag_forces_fault_despite_valid_crc_and_mnr() {
    let (_provider_bridge, consumer_bridge) = LossyBridge::pair();
    let mut consumer = ConsumerSide::new(1, CONSUMER_ID, TIMEOUT_MS, consumer_bridge);

    // Activate, then deliver one crafted response with ACTIVATE_FSV set.
    consumer.mapper.mark_consumer_comm_done(consumer.handle);
    consumer.mapper.cycle(0).unwrap();

    let crc_algo = Crc32IsoHdlc::new();
    let safe_data = safe_data_fixture();
    let non_safe_data = vec![0u8; N_NS];
    let flags = Flags::ACTIVATE_FSV.bits();
    let monitoring_number = 1;
    let crc_input = crc_canonical_input(
        &safe_data,
        &non_safe_data,
        SPDU_ID,
        CONSUMER_ID,
        monitoring_number,
        flags,
        PROVIDER_LEVEL,
    );
    let crc = crc_algo.checksum(&crc_input);

    let resp = ResponseSpdu {
        safe_data: Bytes::from(safe_data),
        non_safe_data: Bytes::from(non_safe_data),
        flags,
        spdu_id: SPDU_ID,
        safety_consumer_id: CONSUMER_ID,
        monitoring_number,
        crc,
    };
    consumer.registry.set_response(1, resp).unwrap();
    consumer.mapper.mark_consumer_comm_done(consumer.handle);
    let report = consumer.mapper.cycle(10).unwrap();

    assert!(matches!(report.consumers[0].outcome, ConsumerOutcome::Fault(_)));
}
