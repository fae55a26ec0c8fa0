//! The connection: a transport, its worker task, and the endpoint registry.

use crate::constants::DEFAULT_INBOX_CAPACITY;
use crate::endpoint::{DiscoveredEndpoint, Endpoint, EndpointId};
use crate::error::AmfiprotError;
use crate::packet::Packet;
use crate::transport::Transport;
use crate::worker::{self, InboundEvent, RoutingTable};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Owns one physical transport, one transmit queue, one global inbox, the
/// worker task, and the set of discovered endpoints.
pub struct Connection {
    outbound_tx: mpsc::Sender<Packet>,
    global_inbox_rx: mpsc::Receiver<InboundEvent>,
    routing_tx: watch::Sender<RoutingTable>,
    stop_tx: watch::Sender<bool>,
    worker_handle: Option<JoinHandle<()>>,
    endpoints: HashMap<EndpointId, Endpoint>,
}

impl Connection {
    /// Starts the worker over `transport`, using `reopen` to re-acquire the
    /// physical handle after a disconnect.
    pub fn start<T, F, Fut>(transport: T, reopen: F) -> Self
    where
        T: Transport + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, AmfiprotError>> + Send,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(DEFAULT_INBOX_CAPACITY);
        let (global_inbox_tx, global_inbox_rx) = mpsc::channel(DEFAULT_INBOX_CAPACITY);
        let (routing_tx, routing_rx) = watch::channel(RoutingTable::new());
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker_handle = tokio::spawn(worker::run(
            transport,
            outbound_rx,
            global_inbox_tx,
            routing_rx,
            stop_rx,
            reopen,
        ));

        Self {
            outbound_tx,
            global_inbox_rx,
            routing_tx,
            stop_tx,
            worker_handle: Some(worker_handle),
            endpoints: HashMap::new(),
        }
    }

    /// Registers a newly discovered (or manually specified) endpoint and
    /// republishes the routing table to the worker.
    pub fn add_endpoint(&mut self, endpoint: Endpoint) {
        let tx_id = endpoint.tx_id;
        let inbox_tx = endpoint.inbox_tx.clone();
        self.endpoints.insert(tx_id, endpoint);
        self.publish_routing_table(tx_id, inbox_tx);
    }

    fn publish_routing_table(&self, tx_id: EndpointId, inbox_tx: mpsc::Sender<Packet>) {
        self.routing_tx.send_modify(|table| {
            table.insert(tx_id, inbox_tx);
        });
    }

    /// Reconciles a fresh discovery result against the currently registered
    /// endpoints. If the set of device UUIDs hasn't changed, only names are
    /// refreshed; if it has, the endpoint registry and routing table are
    /// rebuilt from scratch so stale routes can't linger.
    pub fn sync_endpoints(&mut self, discovered: HashMap<EndpointId, DiscoveredEndpoint>) {
        let previous_uuids: HashSet<_> = self.endpoints.values().map(|e| e.uuid).collect();
        let new_uuids: HashSet<_> = discovered.values().map(|d| d.uuid).collect();

        if previous_uuids == new_uuids {
            for (tx_id, info) in &discovered {
                if let Some(endpoint) = self.endpoints.get_mut(tx_id) {
                    endpoint.name = info.name.clone();
                }
            }
            return;
        }

        tracing::info!("endpoint set changed, rebuilding routing table");
        self.endpoints.clear();
        self.routing_tx.send_modify(|table| table.clear());
        for (tx_id, info) in discovered {
            let mut endpoint = Endpoint::new(tx_id, info.uuid);
            endpoint.name = info.name;
            self.add_endpoint(endpoint);
        }
    }

    pub fn endpoint(&self, tx_id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(&tx_id)
    }

    pub fn endpoint_mut(&mut self, tx_id: EndpointId) -> Option<&mut Endpoint> {
        self.endpoints.get_mut(&tx_id)
    }

    pub fn endpoint_ids(&self) -> impl Iterator<Item = EndpointId> + '_ {
        self.endpoints.keys().copied()
    }

    /// Queues a packet for the worker to frame and write.
    pub async fn send(&self, packet: Packet) -> Result<(), AmfiprotError> {
        self.outbound_tx
            .send(packet)
            .await
            .map_err(|_| AmfiprotError::ConnectionError)
    }

    /// Drains one event from the global inbox: every successfully decoded
    /// inbound packet, regardless of routing, plus the raw bytes of any frame
    /// that failed to parse.
    pub async fn recv_global(&mut self) -> Option<InboundEvent> {
        self.global_inbox_rx.recv().await
    }

    /// Stops the worker task. Idempotent.
    pub async fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
