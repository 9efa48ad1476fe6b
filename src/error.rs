// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The error taxonomy (§7): one variant per kind, not per call site.

use thiserror::Error;

/// A kind of failure the safety core can report.
///
/// `MnrStale` is the single kind that a caller never sees directly: the
/// consumer state machine swallows it (the response is simply dropped, the
/// state is left unchanged) rather than propagating it as a fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("length-error: expected {expected} bytes, got {got}")]
    LengthError { expected: usize, got: usize },

    #[error("crc-error: recomputed crc 0x{recomputed:08x} != received 0x{received:08x}")]
    CrcError { recomputed: u32, received: u32 },

    /// Swallowed by the consumer state machine; kept as a variant so
    /// internal plumbing can still name it precisely in logs and tests.
    #[error("mnr-stale: monitoring number {0} already retired")]
    MnrStale(u32),

    #[error("mnr-mismatch: expected {expected}, got {got}")]
    MnrMismatch { expected: u32, got: u32 },

    #[error("spdu-id-mismatch: expected {expected:?}, got {got:?}")]
    SpduIdMismatch { expected: (u32, u32, u32), got: (u32, u32, u32) },

    #[error("consumer-id-mismatch: expected {expected}, got {got}")]
    ConsumerIdMismatch { expected: u32, got: u32 },

    #[error("timeout: no valid response within {0} ms")]
    Timeout(u32),

    #[error("out-of-memory")]
    OutOfMemory,

    #[error("invalid-parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid-state: {0}")]
    InvalidState(String),

    #[error("not-found")]
    NotFound,

    #[error("not-supported: {0}")]
    NotSupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;
