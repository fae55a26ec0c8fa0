//! Payload taxonomy: a `payload_type` tag selecting either the `COMMON` family
//! (dispatched further by a second ID byte, see [`common`]) or one of the
//! fixed reply-marker tags, or an application-defined passthrough.

pub mod common;

pub use common::{CommonPayload, CommonPayloadId, ConfigValue, ConfigValueType};

use crate::error::AmfiprotError;
use bytes::Bytes;

pub const PAYLOAD_TYPE_COMMON: u8 = 0x00;
pub const PAYLOAD_TYPE_SUCCESS: u8 = 0xF0;
pub const PAYLOAD_TYPE_NOT_IMPLEMENTED: u8 = 0xFD;
pub const PAYLOAD_TYPE_FAILURE: u8 = 0xFE;
pub const PAYLOAD_TYPE_INVALID_REQUEST: u8 = 0xFF;

/// A decoded packet payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// `payload_type == COMMON`, further dispatched by [`CommonPayload`].
    Common(CommonPayload),
    /// Typed markers carrying their raw body for diagnostics.
    Success(Bytes),
    NotImplemented(Bytes),
    Failure(Bytes),
    InvalidRequest(Bytes),
    /// An application-defined or otherwise unrecognized top-level payload type.
    Undefined { tag: u8, data: Bytes },
}

impl Payload {
    /// The single byte written as `payload_type` in the packet header.
    pub fn type_tag(&self) -> u8 {
        match self {
            Payload::Common(_) => PAYLOAD_TYPE_COMMON,
            Payload::Success(_) => PAYLOAD_TYPE_SUCCESS,
            Payload::NotImplemented(_) => PAYLOAD_TYPE_NOT_IMPLEMENTED,
            Payload::Failure(_) => PAYLOAD_TYPE_FAILURE,
            Payload::InvalidRequest(_) => PAYLOAD_TYPE_INVALID_REQUEST,
            Payload::Undefined { tag, .. } => *tag,
        }
    }

    /// The payload body, excluding the `payload_type` byte and both CRCs.
    pub fn encode(&self) -> Bytes {
        match self {
            Payload::Common(c) => c.encode(),
            Payload::Success(b) | Payload::NotImplemented(b) | Payload::Failure(b) | Payload::InvalidRequest(b) => b.clone(),
            Payload::Undefined { data, .. } => data.clone(),
        }
    }

    /// Decodes a payload body given its `payload_type` tag.
    pub fn decode(tag: u8, body: Bytes) -> Result<Self, AmfiprotError> {
        Ok(match tag {
            PAYLOAD_TYPE_COMMON => {
                if body.is_empty() {
                    return Err(AmfiprotError::InsufficientData { expected: 1, actual: 0 });
                }
                let id = body[0];
                Payload::Common(CommonPayload::decode(id, body.slice(1..))?)
            }
            PAYLOAD_TYPE_SUCCESS => Payload::Success(body),
            PAYLOAD_TYPE_NOT_IMPLEMENTED => Payload::NotImplemented(body),
            PAYLOAD_TYPE_FAILURE => Payload::Failure(body),
            PAYLOAD_TYPE_INVALID_REQUEST => Payload::InvalidRequest(body),
            other => Payload::Undefined { tag: other, data: body },
        })
    }

    /// Convenience accessor for session helpers awaiting a specific common-payload
    /// variant (matched on discriminant, ignoring field values).
    pub fn as_common(&self) -> Option<&CommonPayload> {
        match self {
            Payload::Common(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_top_level_type_is_undefined_not_an_error() {
        let payload = Payload::decode(0x42, Bytes::from_static(b"abc")).unwrap();
        assert_eq!(
            payload,
            Payload::Undefined {
                tag: 0x42,
                data: Bytes::from_static(b"abc")
            }
        );
    }

    #[test]
    fn success_marker_keeps_raw_body() {
        let payload = Payload::decode(PAYLOAD_TYPE_SUCCESS, Bytes::from_static(b"\x01\x02")).unwrap();
        assert_eq!(payload.type_tag(), PAYLOAD_TYPE_SUCCESS);
        assert_eq!(payload.encode(), Bytes::from_static(b"\x01\x02"));
    }
}
