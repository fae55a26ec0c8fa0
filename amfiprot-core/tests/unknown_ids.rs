mod common;

use amfiprot_core::error::AmfiprotError;
use amfiprot_core::payload::{CommonPayload, Payload};
use common::Bytes;

#[test]
fn unknown_common_id_is_invalid_common_id_error() {
    let err = CommonPayload::decode(0x7F, Bytes::new()).unwrap_err();
    assert!(matches!(err, AmfiprotError::InvalidCommonId(0x7F)));
}

#[test]
fn unknown_top_level_payload_type_is_undefined_not_an_error() {
    let payload = Payload::decode(0x42, Bytes::from_static(b"hello")).unwrap();
    match payload {
        Payload::Undefined { tag, data } => {
            assert_eq!(tag, 0x42);
            assert_eq!(&data[..], b"hello");
        }
        other => panic!("expected Undefined, got {other:?}"),
    }
}
