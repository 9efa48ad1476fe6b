// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The non-safety-related communication bridge (§4.5, C5): carries encoded
//! SPDUs between this process and its peer over an ordinary (non-safety)
//! transport. The safety cycle only ever polls this trait; it never awaits
//! inside a cycle.

pub mod udp;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use bytes::Bytes;

use crate::error::Result;

/// Non-blocking transport for encoded SPDUs. Implementations own their
/// framing; one call to `send_spdu`/`receive_spdu` corresponds to exactly
/// one SPDU, never a partial or coalesced one.
pub trait NsBridge {
    /// Prepares the bridge for use (binds sockets, resets internal state).
    /// Idempotent: calling it again after `clear()` re-arms the bridge.
    fn initialize(&mut self) -> Result<()>;

    /// Queues `bytes` for transmission to the peer. Fire-and-forget: a
    /// successful return means the datagram was handed to the OS, not that
    /// the peer received it.
    fn send_spdu(&mut self, bytes: &[u8]) -> Result<()>;

    /// Returns the next datagram available without blocking, or `None` if
    /// nothing has arrived since the last poll.
    fn receive_spdu(&mut self) -> Result<Option<Bytes>>;

    /// Releases any bound resources and drops buffered datagrams.
    fn clear(&mut self) -> Result<()>;
}
