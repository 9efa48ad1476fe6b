// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The SPDU registry (§4.2, component C2): owns every decoded
//! `RequestSpdu`/`ResponseSpdu`, keyed by the numeric identifier the
//! publisher/subscriber configuration assigns to each SpduId: one entry per
//! in-flight identifier, looked up and mutated without a single crate-wide
//! lock.

use dashmap::DashMap;

use super::{request::RequestSpdu, response::ResponseSpdu};
use crate::error::{Error, Result};

/// The `(N_s, N_ns)` pair a given SpduId was configured with (§3), used to
/// validate every `ResponseSpdu` decoded for that id.
#[derive(Debug, Clone, Copy)]
pub struct ResponseLengths {
    pub n_s: usize,
    pub n_ns: usize,
}

#[derive(Debug, Default)]
struct Slot {
    request: Option<RequestSpdu>,
    response: Option<ResponseSpdu>,
    response_lengths: Option<ResponseLengths>,
}

/// Decoded-SPDU store, one per process. Never holds a lock across an
/// `.await`: each operation is a single `DashMap` shard access.
#[derive(Debug, Default)]
pub struct Registry {
    slots: DashMap<u32, Slot>,
}

impl Registry {
    pub fn new() -> Self {
        Self { slots: DashMap::new() }
    }

    /// Declares the `(N_s, N_ns)` lengths a numeric id's ResponseSPDU must
    /// satisfy; call once per configured SpduId before any response is
    /// decoded for it.
    pub fn register_response_lengths(&self, numeric_id: u32, lengths: ResponseLengths) {
        self.slots.entry(numeric_id).or_default().response_lengths = Some(lengths);
    }

    /// First-time registration of `numeric_id`'s request slot. `NotSupported`
    /// if a request was already created for this id — ongoing traffic goes
    /// through `set_request` instead.
    pub fn create_request(&self, numeric_id: u32, request: RequestSpdu) -> Result<()> {
        let mut slot = self.slots.entry(numeric_id).or_default();
        if slot.request.is_some() {
            return Err(Error::NotSupported(format!("request already created for numeric id {numeric_id}")));
        }
        slot.request = Some(request);
        Ok(())
    }

    pub fn get_request(&self, numeric_id: u32) -> Result<RequestSpdu> {
        self.slots
            .get(&numeric_id)
            .and_then(|slot| slot.request.clone())
            .ok_or(Error::NotFound)
    }

    pub fn set_request(&self, numeric_id: u32, request: RequestSpdu) {
        self.slots.entry(numeric_id).or_default().request = Some(request);
    }

    /// Decodes and stores a response, enforcing the configured lengths
    /// (Invariant 2, §4.2 `get_response`/`set_response`). `NotFound` if the
    /// id's lengths were never registered; `NotSupported` if a response was
    /// already created for this id (ongoing traffic goes through
    /// `set_response` instead).
    pub fn create_response(&self, numeric_id: u32, raw: &[u8]) -> Result<()> {
        let decoded = ResponseSpdu::decode(raw)?;
        let lengths = {
            let slot = self.slots.get(&numeric_id).ok_or(Error::NotFound)?;
            slot.response_lengths.ok_or(Error::NotFound)?
        };
        decoded.check_lengths(lengths.n_s, lengths.n_ns)?;
        let mut slot = self.slots.entry(numeric_id).or_default();
        if slot.response.is_some() {
            return Err(Error::NotSupported(format!("response already created for numeric id {numeric_id}")));
        }
        slot.response = Some(decoded);
        Ok(())
    }

    pub fn get_response(&self, numeric_id: u32) -> Result<ResponseSpdu> {
        self.slots
            .get(&numeric_id)
            .and_then(|slot| slot.response.clone())
            .ok_or(Error::NotFound)
    }

    pub fn set_response(&self, numeric_id: u32, response: ResponseSpdu) -> Result<()> {
        let lengths = {
            let slot = self.slots.get(&numeric_id).ok_or(Error::NotFound)?;
            slot.response_lengths.ok_or(Error::NotFound)?
        };
        response.check_lengths(lengths.n_s, lengths.n_ns)?;
        self.slots.entry(numeric_id).or_default().response = Some(response);
        Ok(())
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}
