// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Cached data values (§3: CacheEntry / DataValue).
//!
//! An [`ExtensionObject`][DataValue::ExtensionObject] entry holds only its
//! *encoded* bytes and a type tag, never a decoded SPDU — avoiding a cyclic
//! link between cache entries and extension objects. The codec's
//! [`crate::codec::Registry`] is the one place that owns decoded
//! `RequestSpdu`/`ResponseSpdu` values, keyed by the same numeric node id;
//! the cache and the codec registry never need to borrow into each other.

use bytes::Bytes;

/// A scalar cache value, covering the non-structured identifier/flag
/// payloads the data model calls for (consumer ids, flags, …) alongside
/// the string/bytestring/extension-object shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    U32(u32),
    I64(i64),
}

/// Tagged union stored in a [`super::Cache`] entry (§3: DataValue).
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Scalar(Scalar),
    String(String),
    ByteString(Bytes),
    /// Encoded extension-object payload plus the 32-bit type tag that
    /// distinguishes a RequestSPDU from a ResponseSPDU on the wire (§6).
    ExtensionObject { type_tag: u32, body: Bytes },
}

impl DataValue {
    pub fn as_byte_string(&self) -> Option<&Bytes> {
        match self {
            DataValue::ByteString(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_extension_object(&self) -> Option<(u32, &Bytes)> {
        match self {
            DataValue::ExtensionObject { type_tag, body } => Some((*type_tag, body)),
            _ => None,
        }
    }
}
