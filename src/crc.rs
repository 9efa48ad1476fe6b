// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The CRC primitive injection point.
//!
//! No polynomial is mandated (§4.3.2, §9): a [`CrcAlgorithm`] is a trait
//! object the integrator supplies; both the provider and every consumer
//! must be constructed with algorithms that agree, or every response will
//! fail the CRC invariant.
//!
//! [`Crc32IsoHdlc`] is provided only so the unit and integration tests in
//! this crate have something concrete to exercise; it is not a
//! recommendation. Shipping it as the default in a real deployment without
//! an explicit agreement between provider and consumer integrators picks a
//! polynomial nobody actually agreed on.

use std::sync::Arc;

/// A 32-bit CRC function, injected rather than hard-coded (§9 Open
/// Question — CRC primitive).
pub trait CrcAlgorithm: Send + Sync {
    fn checksum(&self, data: &[u8]) -> u32;
}

/// Type-erased handle to an algorithm, cheap to clone and share between a
/// provider and every consumer instance in the same process.
pub type SharedCrc = Arc<dyn CrcAlgorithm>;

impl<F> CrcAlgorithm for F
where F: Fn(&[u8]) -> u32 + Send + Sync
{
    fn checksum(&self, data: &[u8]) -> u32 {
        (self)(data)
    }
}

/// CRC-32/ISO-HDLC over the canonical input, via the `crc` crate.
///
/// Reference/test implementation only — see the module docs.
pub struct Crc32IsoHdlc;

impl Crc32IsoHdlc {
    pub fn new() -> Self {
        Self
    }
}

impl CrcAlgorithm for Crc32IsoHdlc {
    fn checksum(&self, data: &[u8]) -> u32 {
        const ALGO: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
        ALGO.checksum(data)
    }
}
