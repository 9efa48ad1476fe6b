// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The process-wide cache (§4.1, component C1): a single-writer-at-a-time,
//! multi-reader mapping from [`NodeId`] to [`DataValue`].

pub mod node_id;
pub mod value;

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

pub use node_id::{Identifier, NodeId};
pub use value::{DataValue, Scalar};

use crate::error::{Error, Result};

/// A non-recursive, mutex-guarded map from [`NodeId`] to [`DataValue`].
///
/// The mutex is held only for single-key `get`/`set` or for the duration of
/// one `get_source`/`set_target` batch (§4.1, §5) — never across an
/// `.await`, so it is a plain [`std::sync::Mutex`] rather than an async
/// one.
#[derive(Debug, Default)]
pub struct Cache {
    inner: Mutex<HashMap<NodeId, DataValue>>,
}

/// A held lock on the cache, exposed so the safety core can read an entry
/// and decode its contents without the value being swapped out from under
/// it mid-read (§4.1: "lock / unlock").
pub struct CacheGuard<'a> {
    guard: MutexGuard<'a, HashMap<NodeId, DataValue>>,
}

impl<'a> CacheGuard<'a> {
    pub fn get(&self, id: &NodeId) -> Option<&DataValue> {
        self.guard.get(id)
    }

    pub fn set(&mut self, id: NodeId, value: DataValue) {
        self.guard.insert(id, value);
    }
}

impl Cache {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    /// Seeds one entry per publisher/subscriber field declared in the
    /// configuration (§4.1: `init`).
    pub fn init(entries: impl IntoIterator<Item = (NodeId, DataValue)>) -> Self {
        let cache = Self::new();
        for (id, value) in entries {
            // Seeding at init cannot meaningfully fail for the in-memory map;
            // any OOM here is unrecoverable and matches §7's fatal handling.
            cache.set(id, value).expect("cache init: out of memory");
        }
        cache
    }

    /// Hold the cache lock across multiple reads/writes, e.g. while the
    /// safety core decodes an `ExtensionObject` entry (§4.1).
    pub fn lock(&self) -> CacheGuard<'_> {
        CacheGuard { guard: self.inner.lock().expect("cache mutex poisoned") }
    }

    /// Returns a deep copy of the current value; `NotFound` if `id` is
    /// unknown (§4.1: never a crash).
    pub fn get(&self, id: &NodeId) -> Result<DataValue> {
        let guard = self.inner.lock().expect("cache mutex poisoned");
        guard.get(id).cloned().ok_or(Error::NotFound)
    }

    /// Transfers ownership of `value` into the cache, replacing and
    /// releasing any previous entry for `id`.
    pub fn set(&self, id: NodeId, value: DataValue) -> Result<()> {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        guard.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
        guard.insert(id, value);
        Ok(())
    }

    /// Batch read used by the publisher scheduler (§4.1: `get_source`).
    /// Locks the cache for the whole batch so the snapshot is coherent.
    pub fn get_source(&self, ids: &[NodeId]) -> Result<Vec<DataValue>> {
        let guard = self.inner.lock().expect("cache mutex poisoned");
        ids.iter().map(|id| guard.get(id).cloned().ok_or(Error::NotFound)).collect()
    }

    /// Batch write used by the subscriber (§4.1: `set_target`). Each write
    /// moves the incoming value into the cache.
    pub fn set_target(&self, writes: Vec<(NodeId, DataValue)>) -> Result<()> {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        guard.try_reserve(writes.len()).map_err(|_| Error::OutOfMemory)?;
        for (id, value) in writes {
            guard.insert(id, value);
        }
        Ok(())
    }
}
