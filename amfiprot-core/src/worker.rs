//! The transport worker: the single task that owns the physical handle.
//!
//! Drains the outbound queue, reads inbound bytes, decodes packets, and
//! routes them to the global inbox and to whichever endpoint inbox matches
//! `source_tx_id`. Runs until told to stop; a lost transport moves it into a
//! reconnect-poll loop rather than tearing the task down.

use crate::constants::{
    DEFAULT_WRITE_TIMEOUT_MS, RECONNECT_POLL_INTERVAL_MS, WORKER_READ_TIMEOUT_MS,
};
use crate::endpoint::EndpointId;
use crate::error::AmfiprotError;
use crate::packet::Packet;
use crate::transport::Transport;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Routing table snapshot handed to the worker whenever the endpoint set changes.
pub type RoutingTable = HashMap<EndpointId, mpsc::Sender<Packet>>;

/// An item delivered to the global inbox: a successfully decoded packet, or
/// the raw bytes of a frame that failed to parse (surfaced for diagnosis,
/// since a malformed frame has no `source_tx_id` to route by).
pub type InboundEvent = Result<Packet, Vec<u8>>;

/// How the worker currently relates to its physical transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connected,
    Disconnected,
}

/// Runs the worker loop until `outbound` is closed or `stop` fires.
///
/// `reopen` is invoked to re-acquire the transport after a hard I/O error;
/// it is expected to poll a stable device identity (§4.5) rather than an OS
/// handle that may no longer be valid.
pub async fn run<T, F, Fut>(
    mut transport: T,
    mut outbound: mpsc::Receiver<Packet>,
    global_inbox: mpsc::Sender<InboundEvent>,
    mut routing: watch::Receiver<RoutingTable>,
    mut stop: watch::Receiver<bool>,
    mut reopen: F,
) where
    T: Transport,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AmfiprotError>>,
{
    let mut state = WorkerState::Connected;

    loop {
        if *stop.borrow() {
            return;
        }

        if state == WorkerState::Disconnected {
            tokio::select! {
                _ = stop.changed() => { if *stop.borrow() { return; } }
                reopened = reopen() => {
                    match reopened {
                        Ok(new_transport) => {
                            transport = new_transport;
                            state = WorkerState::Connected;
                            tracing::info!("transport reacquired");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "reconnect attempt failed");
                            tokio::time::sleep(Duration::from_millis(RECONNECT_POLL_INTERVAL_MS)).await;
                        }
                    }
                }
            }
            continue;
        }

        // 1. Drain outbound.
        while let Ok(packet) = outbound.try_recv() {
            let frame = transport.frame_out(&packet.to_bytes());
            if let Err(e) = transport
                .write_frame(&frame, Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS))
                .await
            {
                tracing::warn!(error = %e, "dropping outbound packet after write failure");
            }
        }

        // 2. Pick up routing-table updates.
        if routing.has_changed().unwrap_or(false) {
            routing.borrow_and_update();
        }

        // 3. Read one frame.
        match transport
            .read_one_frame(Duration::from_millis(WORKER_READ_TIMEOUT_MS))
            .await
        {
            Ok(None) => continue,
            Ok(Some(bytes)) => route(&bytes, &global_inbox, &routing).await,
            Err(e) => {
                tracing::warn!(error = %e, "transport lost, entering reconnect");
                state = WorkerState::Disconnected;
            }
        }
    }
}

async fn route(bytes: &[u8], global_inbox: &mpsc::Sender<InboundEvent>, routing: &watch::Receiver<RoutingTable>) {
    let packet = match Packet::parse(bytes) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse inbound frame");
            if let Err(mpsc::error::TrySendError::Full(_)) = global_inbox.try_send(Err(bytes.to_vec())) {
                tracing::warn!("global inbox full, dropping malformed frame");
            }
            return;
        }
    };

    if let Err(mpsc::error::TrySendError::Full(_)) = global_inbox.try_send(Ok(packet.clone())) {
        tracing::warn!("global inbox full, dropping packet");
    }

    if let Some(endpoint_tx) = routing.borrow().get(&packet.source_tx_id) {
        if let Err(mpsc::error::TrySendError::Full(_)) = endpoint_tx.try_send(packet) {
            tracing::warn!(tx_id = bytes.get(4).copied().unwrap_or(0), "endpoint inbox full, dropping packet");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketKind;
    use crate::payload::{CommonPayload, Payload};

    #[tokio::test]
    async fn routes_to_global_and_matching_endpoint() {
        let (global_tx, mut global_rx) = mpsc::channel(8);
        let (ep_tx, mut ep_rx) = mpsc::channel(8);
        let mut table = RoutingTable::new();
        table.insert(3, ep_tx);
        let (routing_tx, routing_rx) = watch::channel(table);
        let _ = routing_tx;

        let packet = Packet::from_payload(
            Payload::Common(CommonPayload::RequestCategoryCount),
            0,
            3,
            PacketKind::NoAck,
            0,
        );
        route(&packet.to_bytes(), &global_tx, &routing_rx).await;

        assert!(matches!(global_rx.try_recv(), Ok(Ok(_))));
        assert!(ep_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unmatched_source_only_reaches_global_inbox() {
        let (global_tx, mut global_rx) = mpsc::channel(8);
        let (ep_tx, mut ep_rx) = mpsc::channel(8);
        let mut table = RoutingTable::new();
        table.insert(3, ep_tx);
        let (_routing_tx, routing_rx) = watch::channel(table);

        let packet = Packet::from_payload(
            Payload::Common(CommonPayload::RequestCategoryCount),
            0,
            9,
            PacketKind::NoAck,
            0,
        );
        route(&packet.to_bytes(), &global_tx, &routing_rx).await;

        assert!(matches!(global_rx.try_recv(), Ok(Ok(_))));
        assert!(ep_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_frame_reaches_global_inbox_but_no_endpoint() {
        let (global_tx, mut global_rx) = mpsc::channel(8);
        let (ep_tx, mut ep_rx) = mpsc::channel(8);
        let mut table = RoutingTable::new();
        table.insert(3, ep_tx);
        let (_routing_tx, routing_rx) = watch::channel(table);

        let garbage = vec![0xFFu8; 2];
        route(&garbage, &global_tx, &routing_rx).await;

        match global_rx.try_recv() {
            Ok(Err(bytes)) => assert_eq!(bytes, garbage),
            other => panic!("expected a parse-failure event, got {other:?}"),
        }
        assert!(ep_rx.try_recv().is_err());
    }
}
