// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! SPDU wire codec (§4.2).

pub mod registry;
pub mod request;
pub mod response;

pub use registry::{Registry, ResponseLengths};
pub use request::RequestSpdu;
pub use response::ResponseSpdu;

use crate::error::{Error, Result};

/// Type tag prefixed onto a cached [`crate::cache::DataValue::ExtensionObject`]
/// body to say which SPDU kind it decodes as (§6).
pub const TYPE_TAG_REQUEST: u32 = 1;
pub const TYPE_TAG_RESPONSE: u32 = 2;

/// A decoded SPDU of either kind, dispatched on a numeric type tag rather
/// than type-level generics — there are only two shapes here, so a concrete
/// enum is simpler than a descriptor-driven walker.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionObject {
    Request(RequestSpdu),
    Response(ResponseSpdu),
}

impl ExtensionObject {
    pub fn type_tag(&self) -> u32 {
        match self {
            ExtensionObject::Request(_) => TYPE_TAG_REQUEST,
            ExtensionObject::Response(_) => TYPE_TAG_RESPONSE,
        }
    }

    pub fn decode(type_tag: u32, body: &[u8]) -> Result<Self> {
        match type_tag {
            TYPE_TAG_REQUEST => Ok(ExtensionObject::Request(RequestSpdu::from_bytes(body)?)),
            TYPE_TAG_RESPONSE => Ok(ExtensionObject::Response(ResponseSpdu::decode(body)?)),
            other => Err(Error::NotSupported(format!("unknown extension object type tag {other}"))),
        }
    }
}
