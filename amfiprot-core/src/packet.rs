//! Packet codec: header layout, CRC framing, and the top-level packet type.

use crate::constants::*;
use crate::crc::crc8;
use crate::error::AmfiprotError;
use crate::payload::Payload;
use bytes::{BufMut, Bytes, BytesMut};
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};

/// The `packet_type` byte: bits 7:6 select the kind, bits 5:0 are a TTL hint.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketTypeByte {
    pub ttl: B6,
    pub kind: B2,
}

/// The four kinds a packet's `packet_type` field may carry in its top two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum PacketKind {
    NoAck = 0,
    RequestAck = 1,
    Ack = 2,
    Reply = 3,
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// A fully decoded Amfiprot packet: header fields plus its typed payload.
///
/// A CRC mismatch does not prevent a packet from being decoded and routed
/// (see the worker's observability policy); `header_crc_ok`/`payload_crc_ok`
/// record whether each check passed so callers can surface the diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub kind: PacketKind,
    pub ttl: u8,
    pub packet_number: u8,
    pub source_tx_id: u8,
    pub destination_tx_id: u8,
    pub payload: Payload,
    pub header_crc_ok: bool,
    pub payload_crc_ok: bool,
}

impl Packet {
    /// Builds a packet from a payload and addressing fields, matching
    /// `Packet::from_payload` in the protocol design.
    pub fn from_payload(
        payload: Payload,
        destination_tx_id: u8,
        source_tx_id: u8,
        kind: PacketKind,
        packet_number: u8,
    ) -> Self {
        Self {
            kind,
            ttl: 0,
            packet_number,
            source_tx_id,
            destination_tx_id,
            payload,
            header_crc_ok: true,
            payload_crc_ok: true,
        }
    }

    /// Serializes this packet to its wire form: header, payload body, two CRC bytes
    /// (the payload CRC and payload body are omitted when the payload is empty).
    pub fn to_bytes(&self) -> Bytes {
        let payload_body = self.payload.encode();
        let payload_length: u8 = payload_body
            .len()
            .try_into()
            .expect("payload longer than a single packet can carry");

        let type_byte = PacketTypeByte::new().with_ttl(self.ttl).with_kind(self.kind.into());

        let mut header = [0u8; 6];
        header[0] = payload_length;
        header[1] = type_byte.into_bytes()[0];
        header[2] = self.packet_number;
        header[3] = self.payload.type_tag();
        header[4] = self.source_tx_id;
        header[5] = self.destination_tx_id;
        let header_crc = crc8(&header);

        let mut out = BytesMut::with_capacity(HEADER_SIZE + payload_body.len() + 1);
        out.put_slice(&header);
        out.put_u8(header_crc);
        if payload_length > 0 {
            out.put_slice(&payload_body);
            out.put_u8(crc8(&payload_body));
        }
        out.freeze()
    }

    /// Parses a packet from raw transport bytes. The payload body starts at
    /// offset 7, immediately after `header_crc` (the canonical offset; see
    /// design notes on the stale alternative that skips it implicitly).
    pub fn parse(bytes: &[u8]) -> Result<Self, AmfiprotError> {
        if bytes.len() < HEADER_SIZE {
            return Err(AmfiprotError::InsufficientData {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let payload_length = bytes[0] as usize;
        let type_byte = PacketTypeByte::from_bytes([bytes[1]]);
        let packet_number = bytes[2];
        let payload_type = bytes[3];
        let source_tx_id = bytes[4];
        let destination_tx_id = bytes[5];
        let header_crc = bytes[6];

        // A CRC mismatch is reported but not fatal: the packet is still decoded
        // and handed to the caller for routing (see worker observability policy).
        let header_crc_ok = crc8(&bytes[0..6]) == header_crc;
        if !header_crc_ok {
            tracing::warn!(expected = header_crc, computed = crc8(&bytes[0..6]), "header CRC mismatch");
        }

        let (payload, payload_crc_ok) = if payload_length == 0 {
            (Payload::decode(payload_type, Bytes::new())?, true)
        } else {
            let total_needed = HEADER_SIZE + payload_length + 1;
            if bytes.len() < total_needed {
                return Err(AmfiprotError::InsufficientData {
                    expected: total_needed,
                    actual: bytes.len(),
                });
            }
            let body = Bytes::copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + payload_length]);
            let payload_crc = bytes[HEADER_SIZE + payload_length];
            let computed_payload_crc = crc8(&body);
            let payload_crc_ok = computed_payload_crc == payload_crc;
            if !payload_crc_ok {
                tracing::warn!(expected = payload_crc, computed = computed_payload_crc, "payload CRC mismatch");
            }
            (Payload::decode(payload_type, body)?, payload_crc_ok)
        };

        Ok(Packet {
            kind: PacketKind::from_primitive(type_byte.kind()),
            ttl: type_byte.ttl(),
            packet_number,
            source_tx_id,
            destination_tx_id,
            payload,
            header_crc_ok,
            payload_crc_ok,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::CommonPayload;

    #[test]
    fn build_and_parse_reply_device_name() {
        let payload = Payload::Common(CommonPayload::ReplyDeviceName { name: "Sensor".to_string() });
        let packet = Packet::from_payload(payload, 0, 7, PacketKind::NoAck, 0);
        let bytes = packet.to_bytes();

        // header: len=0x08, type=0x00 (NoAck, ttl 0), seq=0, payload_type=COMMON(0x00),
        // src=7, dst=0, then header_crc, then ID(0x09) + "Sensor\0", then payload_crc.
        assert_eq!(bytes[0], 0x08);
        assert_eq!(bytes[1], 0x00);
        assert_eq!(bytes[2], 0x00);
        assert_eq!(bytes[3], 0x00);
        assert_eq!(bytes[4], 7);
        assert_eq!(bytes[5], 0);
        assert_eq!(&bytes[7..7 + 8], &[0x09, b'S', b'e', b'n', b's', b'o', b'r', 0x00]);

        let parsed = Packet::parse(&bytes).unwrap();
        assert_eq!(
            parsed.payload,
            Payload::Common(CommonPayload::ReplyDeviceName { name: "Sensor".to_string() })
        );
        assert_eq!(parsed.source_tx_id, 7);
        assert_eq!(parsed.destination_tx_id, 0);
    }

    #[test]
    fn round_trips_through_bytes() {
        let payload = Payload::Common(CommonPayload::RequestCategoryCount);
        let packet = Packet::from_payload(payload.clone(), 3, 0, PacketKind::RequestAck, 42);
        let parsed = Packet::parse(&packet.to_bytes()).unwrap();
        assert_eq!(parsed.payload, payload);
        assert_eq!(parsed.packet_number, 42);
        assert_eq!(parsed.destination_tx_id, 3);
        assert_eq!(parsed.kind, PacketKind::RequestAck);
    }

    #[test]
    fn zero_length_payload_has_no_trailing_crc() {
        // A genuinely empty payload body (e.g. a bare SUCCESS marker with no
        // diagnostic bytes) carries no payload bytes and no payload CRC at all —
        // unlike a COMMON payload, whose length always counts at least the ID byte.
        let payload = Payload::Success(Bytes::new());
        let packet = Packet::from_payload(payload, 255, 0, PacketKind::NoAck, 0);
        let bytes = packet.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        let parsed = Packet::parse(&bytes).unwrap();
        assert_eq!(parsed.payload, Payload::Success(Bytes::new()));
    }

    #[test]
    fn rejects_short_input() {
        assert!(Packet::parse(&[0u8; 3]).is_err());
    }
}
