//! Common test utilities and shared imports

pub mod mock_transport;

// Allow unused imports and dead code since this is a shared module used
// across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use amfiprot_core::error::AmfiprotError;
#[allow(unused_imports)]
pub use amfiprot_core::packet::{Packet, PacketKind};
#[allow(unused_imports)]
pub use amfiprot_core::payload::{CommonPayload, Payload};
#[allow(unused_imports)]
pub use amfiprot_core::uuid::DeviceUuid;
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use hex;

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Bytes {
    Bytes::from(hex::decode(hex_data).expect("failed to decode hex"))
}

/// A `REPLY_DEVICE_NAME` packet for "Sensor", dest=0, src=7, matching the
/// build/parse scenario: header, ID byte, NUL-terminated name, two CRCs.
#[allow(dead_code)]
pub fn reply_device_name_packet() -> Packet {
    Packet::from_payload(
        Payload::Common(CommonPayload::ReplyDeviceName { name: "Sensor".to_string() }),
        0,
        7,
        PacketKind::NoAck,
        0,
    )
}
