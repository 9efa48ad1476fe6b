// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! RequestSPDU wire layout (§4.2): `safetyConsumerId:u32`,
//! `monitoringNumber:u32`, `flags:u8`, all little-endian, 9 bytes total.
//!
//! Fixed-width and flat, so it is represented directly as a zerocopy
//! struct rather than hand-rolled encode/decode.

use zerocopy::{
    FromBytes as ZFromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, U32,
};

use crate::error::{Error, Result};

pub const REQUEST_SPDU_LEN: usize = 9;

#[repr(C)]
#[derive(Debug, Default, Clone, PartialEq, ZFromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RequestSpdu {
    pub safety_consumer_id: U32<LittleEndian>,
    pub monitoring_number: U32<LittleEndian>,
    pub flags: u8,
}

impl RequestSpdu {
    pub fn new(safety_consumer_id: u32, monitoring_number: u32, flags: u8) -> Self {
        Self {
            safety_consumer_id: U32::new(safety_consumer_id),
            monitoring_number: U32::new(monitoring_number),
            flags,
        }
    }

    pub fn to_bytes(&self) -> [u8; REQUEST_SPDU_LEN] {
        let mut out = [0u8; REQUEST_SPDU_LEN];
        out.copy_from_slice(self.as_bytes());
        out
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < REQUEST_SPDU_LEN {
            return Err(Error::LengthError { expected: REQUEST_SPDU_LEN, got: buf.len() });
        }
        Self::ref_from_bytes(&buf[..REQUEST_SPDU_LEN])
            .map(|r| r.clone())
            .map_err(|_| Error::LengthError { expected: REQUEST_SPDU_LEN, got: buf.len() })
    }
}
