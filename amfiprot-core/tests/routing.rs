mod common;

use amfiprot_core::connection::Connection;
use amfiprot_core::endpoint::Endpoint;
use amfiprot_core::error::AmfiprotError;
use amfiprot_core::packet::PacketKind;
use amfiprot_core::payload::{CommonPayload, Payload};
use amfiprot_core::uuid::DeviceUuid;
use common::mock_transport::MockTransport;
use std::time::Duration;

#[tokio::test]
async fn two_endpoints_each_receive_only_their_own_traffic() {
    let transport = MockTransport::new();

    let packet_from_3 = amfiprot_core::packet::Packet::from_payload(
        Payload::Common(CommonPayload::RequestCategoryCount),
        0,
        3,
        PacketKind::NoAck,
        0,
    );
    let packet_from_4 = amfiprot_core::packet::Packet::from_payload(
        Payload::Common(CommonPayload::RequestCategoryCount),
        0,
        4,
        PacketKind::NoAck,
        1,
    );
    transport.push_inbound(packet_from_3.to_bytes().to_vec());
    transport.push_inbound(packet_from_4.to_bytes().to_vec());

    let mut connection = Connection::start(transport, || async {
        Err(AmfiprotError::ConnectionError)
    });
    connection.add_endpoint(Endpoint::new(3, DeviceUuid::from_limbs(0, 0, 3)));
    connection.add_endpoint(Endpoint::new(4, DeviceUuid::from_limbs(0, 0, 4)));

    let ep3 = connection.endpoint_mut(3).unwrap();
    let from_3 = ep3.await_packet(Duration::from_millis(200), |_| true).await.unwrap();
    assert_eq!(from_3.source_tx_id, 3);

    let ep4 = connection.endpoint_mut(4).unwrap();
    let from_4 = ep4.await_packet(Duration::from_millis(200), |_| true).await.unwrap();
    assert_eq!(from_4.source_tx_id, 4);

    let first_global = connection.recv_global().await.unwrap().expect("well-formed frame");
    let second_global = connection.recv_global().await.unwrap().expect("well-formed frame");
    assert_eq!(
        [first_global.source_tx_id, second_global.source_tx_id].iter().filter(|&&id| id == 3).count(),
        1
    );
    assert_eq!(
        [first_global.source_tx_id, second_global.source_tx_id].iter().filter(|&&id| id == 4).count(),
        1
    );

    connection.stop().await;
}
