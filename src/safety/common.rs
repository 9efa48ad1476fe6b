// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Shared state-machine scaffolding (§4.3.1–4.3.3).

use bitflags::bitflags;

/// The outcome of one state's `step`. `step` here is synchronous (see
/// [`StateMachine`]): the provider/consumer cycles never block, and
/// `Mapper::cycle` must not hand scheduling to the async runtime mid-cycle.
#[derive(Debug)]
pub enum Transition<S, R> {
    Next(S, R),
    Stay(R),
    Done(R),
}

/// A single named state. `Driving` is the enum (`ProviderState`,
/// `ConsumerState`) the cycle loop matches on to dispatch the next `step`;
/// `Ctx` is the per-instance working state the step reads and mutates.
pub trait StateMachine<Ctx, Driving, Out> {
    fn step(self, ctx: &mut Ctx) -> Transition<Driving, Out>;
}

bitflags! {
    /// Response/request flag byte (§4.3.3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u8 {
        const COMM_ERROR             = 0b0000_0001;
        const FSV_ACTIVATED          = 0b0000_0010;
        const OPERATOR_ACK_REQUESTED = 0b0000_0100;
        const ACTIVATE_FSV           = 0b0000_1000;
        const TEST_MODE_ACTIVATED    = 0b0001_0000;
        const OPERATOR_ACK_PROVIDER  = 0b0010_0000;
    }
}

/// The canonical CRC input (§4.3.2): `safeData || nonSafeData || spduId.. ||
/// consumerId || mnr || flags || providerLevel`, all multi-byte integers
/// little-endian.
pub fn crc_canonical_input(
    safe_data: &[u8],
    non_safe_data: &[u8],
    spdu_id: (u32, u32, u32),
    consumer_id: u32,
    mnr: u32,
    flags: u8,
    provider_level: u8,
) -> Vec<u8> {
    let mut buf =
        Vec::with_capacity(safe_data.len() + non_safe_data.len() + 3 * 4 + 4 + 4 + 1 + 1);
    buf.extend_from_slice(safe_data);
    buf.extend_from_slice(non_safe_data);
    buf.extend_from_slice(&spdu_id.0.to_le_bytes());
    buf.extend_from_slice(&spdu_id.1.to_le_bytes());
    buf.extend_from_slice(&spdu_id.2.to_le_bytes());
    buf.extend_from_slice(&consumer_id.to_le_bytes());
    buf.extend_from_slice(&mnr.to_le_bytes());
    buf.push(flags);
    buf.push(provider_level);
    buf
}

/// `MNR_next = MNR_current + 1`, skipping 0 (§4.3.5 step 1, §8 boundary:
/// after `u32::MAX` the next MNR is 1).
pub fn next_mnr(current: u32) -> u32 {
    let next = current.wrapping_add(1);
    if next == 0 { 1 } else { next }
}
