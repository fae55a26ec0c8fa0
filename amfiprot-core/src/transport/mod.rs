//! Transport framing adapters. A transport turns packet bytes into frame bytes
//! (and back) and performs the physical read/write; new transports plug in by
//! implementing [`Transport`].

pub mod hid;
pub mod uart;

use crate::error::AmfiprotError;
use std::time::Duration;

/// The three operations a transport must provide (see design §4.6).
pub trait Transport: Send {
    /// Turns packet bytes into the bytes actually written to the wire.
    fn frame_out(&self, packet_bytes: &[u8]) -> Vec<u8>;

    /// The largest payload a packet on this transport can carry.
    fn max_payload_size(&self) -> usize;

    /// Writes one already-framed frame, bounded by `timeout`.
    fn write_frame(
        &mut self,
        frame: &[u8],
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<(), AmfiprotError>> + Send;

    /// Reads one frame and de-frames it back to packet bytes. Returns `Ok(None)`
    /// on a read timeout (the normal, expected case in the worker's poll loop).
    fn read_one_frame(
        &mut self,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, AmfiprotError>> + Send;
}
