// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! ResponseSPDU wire layout (§4.2):
//!
//! `serializedSafetyData:bytestring`, `serializedNonSafetyData:bytestring`,
//! `flags:u8`, `spduIdPart1:u32`, `spduIdPart2:u32`, `spduIdPart3:u32`,
//! `safetyConsumerId:u32`, `monitoringNumber:u32`, `crc:u32`. All integers
//! little-endian; a bytestring is a `u32` length prefix followed by that
//! many bytes.
//!
//! Two variable-length fields sit ahead of the fixed tail, so (unlike
//! [`super::request::RequestSpdu`]) this is not representable as a single
//! flat zerocopy struct; encode/decode walk the field list by hand in
//! explicit offset arithmetic rather than through one derived layout.

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpdu {
    pub safe_data: Bytes,
    pub non_safe_data: Bytes,
    pub flags: u8,
    pub spdu_id: (u32, u32, u32),
    pub safety_consumer_id: u32,
    pub monitoring_number: u32,
    pub crc: u32,
}

impl ResponseSpdu {
    /// Everything except `crc`, in wire order — the canonical CRC input is
    /// `safeData || nonSafeData || spduId.. || consumerId || mnr || flags`
    /// (§4.3.2), which reorders `flags` relative to the wire layout, so this
    /// is deliberately *not* the same byte sequence as `encode()` sans CRC.
    pub fn encode(&self) -> BytesMut {
        let mut out = BytesMut::with_capacity(
            4 + self.safe_data.len() + 4 + self.non_safe_data.len() + 1 + 4 * 6,
        );
        encode_bytestring(&mut out, &self.safe_data);
        encode_bytestring(&mut out, &self.non_safe_data);
        out.extend_from_slice(&[self.flags]);
        out.extend_from_slice(&self.spdu_id.0.to_le_bytes());
        out.extend_from_slice(&self.spdu_id.1.to_le_bytes());
        out.extend_from_slice(&self.spdu_id.2.to_le_bytes());
        out.extend_from_slice(&self.safety_consumer_id.to_le_bytes());
        out.extend_from_slice(&self.monitoring_number.to_le_bytes());
        out.extend_from_slice(&self.crc.to_le_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cur = Cursor { buf, pos: 0 };
        let safe_data = cur.take_bytestring()?;
        let non_safe_data = cur.take_bytestring()?;
        let flags = cur.take_u8()?;
        let spdu_id = (cur.take_u32()?, cur.take_u32()?, cur.take_u32()?);
        let safety_consumer_id = cur.take_u32()?;
        let monitoring_number = cur.take_u32()?;
        let crc = cur.take_u32()?;
        Ok(Self {
            safe_data,
            non_safe_data,
            flags,
            spdu_id,
            safety_consumer_id,
            monitoring_number,
            crc,
        })
    }

    /// `length-error` (§7) if the decoded bytestring lengths do not match
    /// the `(N_s, N_ns)` pair configured for this SpduId (Invariant 2 /
    /// §4.2 `get_response`).
    pub fn check_lengths(&self, n_s: usize, n_ns: usize) -> Result<()> {
        if self.safe_data.len() != n_s {
            return Err(Error::LengthError { expected: n_s, got: self.safe_data.len() });
        }
        if self.non_safe_data.len() != n_ns {
            return Err(Error::LengthError { expected: n_ns, got: self.non_safe_data.len() });
        }
        Ok(())
    }
}

fn encode_bytestring(out: &mut BytesMut, data: &Bytes) {
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take_u8(&mut self) -> Result<u8> {
        if self.remaining() < 1 {
            return Err(Error::LengthError { expected: 1, got: self.remaining() });
        }
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn take_u32(&mut self) -> Result<u32> {
        if self.remaining() < 4 {
            return Err(Error::LengthError { expected: 4, got: self.remaining() });
        }
        let v = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().expect(
            "slice of length 4 always converts to [u8; 4]",
        ));
        self.pos += 4;
        Ok(v)
    }

    fn take_bytestring(&mut self) -> Result<Bytes> {
        let len = self.take_u32()? as usize;
        if self.remaining() < len {
            return Err(Error::LengthError { expected: len, got: self.remaining() });
        }
        let bytes = Bytes::copy_from_slice(&self.buf[self.pos..self.pos + len]);
        self.pos += len;
        Ok(bytes)
    }
}
