//! An in-memory transport for exercising the worker/connection/endpoint
//! plumbing without a physical device.

use amfiprot_core::error::AmfiprotError;
use amfiprot_core::transport::Transport;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct MockTransport {
    inbound: Arc<Mutex<VecDeque<Vec<u8>>>>,
    outbound: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw packet's bytes as if they had just arrived on the wire.
    #[allow(dead_code)]
    pub fn push_inbound(&self, frame: Vec<u8>) {
        self.inbound.lock().unwrap().push_back(frame);
    }

    #[allow(dead_code)]
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.outbound.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn frame_out(&self, packet_bytes: &[u8]) -> Vec<u8> {
        packet_bytes.to_vec()
    }

    fn max_payload_size(&self) -> usize {
        54
    }

    async fn write_frame(&mut self, frame: &[u8], _timeout: Duration) -> Result<(), AmfiprotError> {
        self.outbound.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    async fn read_one_frame(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, AmfiprotError> {
        if let Some(frame) = self.inbound.lock().unwrap().pop_front() {
            return Ok(Some(frame));
        }
        tokio::time::sleep(timeout).await;
        Ok(None)
    }
}
