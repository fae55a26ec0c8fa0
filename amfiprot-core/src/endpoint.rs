//! Endpoints: the logical devices multiplexed over one physical transport.

use crate::constants::{BROADCAST_TX_ID, DEFAULT_INBOX_CAPACITY, DISCOVERY_WINDOW_MS, HOST_TX_ID};
use crate::error::AmfiprotError;
use crate::packet::{Packet, PacketKind};
use crate::payload::{CommonPayload, Payload};
use crate::transport::Transport;
use crate::uuid::DeviceUuid;
use md5::{Digest, Md5};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// The `tx_id` a device uses to identify itself on the link.
pub type EndpointId = u8;

/// A discovered logical device: its address, identity, and inbound queue.
pub struct Endpoint {
    pub tx_id: EndpointId,
    pub uuid: DeviceUuid,
    pub name: Option<String>,
    pub(crate) inbox_tx: mpsc::Sender<Packet>,
    inbox_rx: mpsc::Receiver<Packet>,
    next_packet_number: u8,
}

impl Endpoint {
    /// Creates an endpoint for a known `{tx_id, uuid}` pair — the shape
    /// discovery produces, or a manually specified identity.
    pub fn new(tx_id: EndpointId, uuid: DeviceUuid) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(DEFAULT_INBOX_CAPACITY);
        Self {
            tx_id,
            uuid,
            name: None,
            inbox_tx,
            inbox_rx,
            next_packet_number: 0,
        }
    }

    /// Allocates the next `packet_number` for a packet addressed to this endpoint.
    pub fn next_packet_number(&mut self) -> u8 {
        let n = self.next_packet_number;
        self.next_packet_number = self.next_packet_number.wrapping_add(1);
        n
    }

    /// Delivers a packet known to have come from this endpoint. Drop-newest on
    /// a full inbox, per the routing overflow policy.
    pub(crate) fn deliver(&self, packet: Packet) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.inbox_tx.try_send(packet) {
            tracing::warn!(tx_id = self.tx_id, "endpoint inbox full, dropping packet");
        }
    }

    /// Waits for the next packet whose payload matches `matches`, or times out.
    pub async fn await_packet<F>(&mut self, deadline: Duration, matches: F) -> Result<Packet, AmfiprotError>
    where
        F: Fn(&Payload) -> bool,
    {
        let start = Instant::now();
        loop {
            let remaining = deadline.checked_sub(start.elapsed()).unwrap_or(Duration::ZERO);
            let packet = tokio::time::timeout(remaining, self.inbox_rx.recv())
                .await?
                .ok_or(AmfiprotError::ConnectionError)?;
            if matches(&packet.payload) {
                return Ok(packet);
            }
        }
    }
}

/// Stable identity of a physical device, independent of any OS handle, used to
/// re-acquire the same device across disconnect/reconnect.
pub fn device_hash(vendor: &str, product: &str, manufacturer: &str, product_string: &str, serial: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(vendor.as_bytes());
    hasher.update(product.as_bytes());
    hasher.update(manufacturer.as_bytes());
    hasher.update(product_string.as_bytes());
    hasher.update(serial.as_bytes());
    hex::encode(hasher.finalize())
}

/// One endpoint surfaced by [`discover`]: its identity plus the name recorded
/// from its `REPLY_DEVICE_NAME` reply, if one arrived within the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEndpoint {
    pub uuid: DeviceUuid,
    pub name: Option<String>,
}

/// Broadcasts `REQUEST_DEVICE_ID`, collects replies for the discovery window,
/// deduplicates by UUID, then unicasts `REQUEST_DEVICE_NAME` to each endpoint
/// found and records its name. Runs directly on the transport handle before a
/// worker is started.
pub async fn discover<T: Transport>(
    transport: &mut T,
    window: Duration,
) -> Result<HashMap<EndpointId, DiscoveredEndpoint>, AmfiprotError> {
    let request = Packet::from_payload(
        Payload::Common(CommonPayload::RequestDeviceId),
        BROADCAST_TX_ID,
        HOST_TX_ID,
        PacketKind::NoAck,
        0,
    );
    let frame = transport.frame_out(&request.to_bytes());
    transport.write_frame(&frame, Duration::from_millis(1000)).await?;

    let mut found: HashMap<EndpointId, DeviceUuid> = HashMap::new();
    let start = Instant::now();
    while start.elapsed() < window {
        let remaining = window.saturating_sub(start.elapsed());
        match transport.read_one_frame(remaining.min(Duration::from_millis(50))).await {
            Ok(Some(bytes)) => {
                if let Ok(packet) = Packet::parse(&bytes) {
                    if let Payload::Common(CommonPayload::ReplyDeviceId { tx_id, uuid }) = packet.payload {
                        found.entry(tx_id).or_insert(uuid);
                    }
                }
            }
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "transport error during discovery");
            }
        }
    }

    let mut discovered = HashMap::with_capacity(found.len());
    for (tx_id, uuid) in found {
        let name = query_device_name(transport, tx_id, window).await;
        discovered.insert(tx_id, DiscoveredEndpoint { uuid, name });
    }
    Ok(discovered)
}

/// Unicasts `REQUEST_DEVICE_NAME` to `tx_id` and waits up to `window` for the
/// matching `REPLY_DEVICE_NAME`. Returns `None` on timeout or transport error
/// rather than failing discovery for the remaining endpoints.
async fn query_device_name<T: Transport>(transport: &mut T, tx_id: EndpointId, window: Duration) -> Option<String> {
    let request = Packet::from_payload(
        Payload::Common(CommonPayload::RequestDeviceName),
        tx_id,
        HOST_TX_ID,
        PacketKind::RequestAck,
        0,
    );
    let frame = transport.frame_out(&request.to_bytes());
    if let Err(e) = transport.write_frame(&frame, Duration::from_millis(1000)).await {
        tracing::warn!(tx_id, error = %e, "failed to send device name request during discovery");
        return None;
    }

    let start = Instant::now();
    while start.elapsed() < window {
        let remaining = window.saturating_sub(start.elapsed());
        match transport.read_one_frame(remaining.min(Duration::from_millis(50))).await {
            Ok(Some(bytes)) => {
                if let Ok(packet) = Packet::parse(&bytes) {
                    if packet.source_tx_id == tx_id {
                        if let Payload::Common(CommonPayload::ReplyDeviceName { name }) = packet.payload {
                            return Some(name);
                        }
                    }
                }
            }
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(tx_id, error = %e, "transport error while awaiting device name");
                return None;
            }
        }
    }
    None
}

/// Convenience wrapper around [`discover`] using the default collection window.
pub async fn discover_default<T: Transport>(transport: &mut T) -> Result<HashMap<EndpointId, DiscoveredEndpoint>, AmfiprotError> {
    discover(transport, Duration::from_millis(DISCOVERY_WINDOW_MS)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_number_wraps_at_256() {
        let mut ep = Endpoint::new(3, DeviceUuid::from_limbs(0, 0, 0));
        ep.next_packet_number = 255;
        assert_eq!(ep.next_packet_number(), 255);
        assert_eq!(ep.next_packet_number(), 0);
    }

    #[test]
    fn device_hash_is_deterministic() {
        let a = device_hash("1a86", "5512", "FTDI", "KM003C", "0001");
        let b = device_hash("1a86", "5512", "FTDI", "KM003C", "0001");
        assert_eq!(a, b);
    }

    #[test]
    fn device_hash_distinguishes_serial() {
        let a = device_hash("1a86", "5512", "FTDI", "KM003C", "0001");
        let b = device_hash("1a86", "5512", "FTDI", "KM003C", "0002");
        assert_ne!(a, b);
    }
}
