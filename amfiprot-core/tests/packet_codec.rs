mod common;

use amfiprot_core::crc::crc8;
use amfiprot_core::uuid::DeviceUuid;
use common::{reply_device_name_packet, Packet};

#[test]
fn crc8_pins_the_reference_vectors() {
    assert_eq!(crc8(&[]), 0x00);
    assert_eq!(crc8(&[0x00]), 0x00);
    // Pinned against the polynomial 0x12F (generator 0x2F), init 0, non-reflected.
    assert_eq!(crc8(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]), 0x37);
}

#[test]
fn builds_and_parses_reply_device_name() {
    let packet = reply_device_name_packet();
    let bytes = packet.to_bytes();

    assert_eq!(bytes[0], 0x08);
    assert_eq!(bytes[4], 7);
    assert_eq!(bytes[5], 0);
    assert_eq!(&bytes[7..15], b"\x09Sensor\x00");

    let parsed = Packet::parse(&bytes).unwrap();
    assert!(parsed.header_crc_ok);
    assert!(parsed.payload_crc_ok);
}

#[test]
fn uuid_block_reversal_matches_the_reference_example() {
    let uuid = DeviceUuid::from_limbs(0x0102_0304, 0x0506_0708, 0x090A_0B0C);
    assert_eq!(
        uuid.to_wire_bytes(),
        [0x09, 0x0A, 0x0B, 0x0C, 0x05, 0x06, 0x07, 0x08, 0x01, 0x02, 0x03, 0x04]
    );
    assert_eq!(DeviceUuid::from_wire_bytes(&uuid.to_wire_bytes()).unwrap(), uuid);
}
