//! USB-HID transport: 64-byte interrupt reports, a leading HID report ID on
//! the way out, and two bytes of report metadata to skip on the way in.

use crate::error::AmfiprotError;
use crate::transport::Transport;
use nusb::Interface;
use nusb::io::{EndpointRead, EndpointWrite};
use nusb::transfer::Interrupt;
use std::time::Duration;
use tokio::time::timeout;

const REPORT_ID: u8 = 0x01;
const FRAME_SIZE: usize = 64;
const INBOUND_HEADER_SKIP: usize = 2;

/// Largest payload a HID frame can carry: 64 − 7 (packet header) − 1 (payload
/// CRC) − 2 (HID report overhead).
pub const HID_MAX_PAYLOAD_SIZE: usize = FRAME_SIZE - 7 - 1 - 2;

/// Prepends the HID report ID and pads to a fixed 64-byte report.
///
/// Panics if `packet_bytes` does not fit in a single report; callers are
/// expected to have already checked against [`HID_MAX_PAYLOAD_SIZE`].
pub fn frame_out(packet_bytes: &[u8]) -> Vec<u8> {
    assert!(
        packet_bytes.len() + 1 <= FRAME_SIZE,
        "packet does not fit in a single HID report"
    );
    let mut frame = Vec::with_capacity(FRAME_SIZE);
    frame.push(REPORT_ID);
    frame.extend_from_slice(packet_bytes);
    frame.resize(FRAME_SIZE, 0);
    frame
}

/// Strips the report-ID and length-metadata bytes from an inbound report.
pub fn deframe_in(report: &[u8]) -> &[u8] {
    if report.len() <= INBOUND_HEADER_SKIP {
        &[]
    } else {
        &report[INBOUND_HEADER_SKIP..]
    }
}

/// A HID transport backed by a claimed `nusb` interface, reading and writing
/// fixed-size interrupt reports on a pair of endpoints.
pub struct HidTransport {
    reader: EndpointRead<Interrupt>,
    writer: EndpointWrite<Interrupt>,
}

impl HidTransport {
    /// Claims `interface_number` on `device` and opens persistent interrupt
    /// endpoints `endpoint_in`/`endpoint_out` for reading and writing reports.
    pub async fn open(
        device: &nusb::Device,
        interface_number: u8,
        endpoint_in: u8,
        endpoint_out: u8,
    ) -> Result<Self, AmfiprotError> {
        let interface = device.claim_interface(interface_number).await?;
        Self::from_interface(&interface, endpoint_in, endpoint_out)
    }

    /// Wraps an already-claimed interface, for callers that manage interface
    /// lifetime themselves (e.g. sharing one device across interfaces).
    pub fn from_interface(
        interface: &Interface,
        endpoint_in: u8,
        endpoint_out: u8,
    ) -> Result<Self, AmfiprotError> {
        let ep_in = interface.endpoint::<Interrupt, _>(endpoint_in)?;
        let ep_out = interface.endpoint::<Interrupt, _>(endpoint_out)?;
        Ok(Self {
            reader: ep_in.reader(FRAME_SIZE).with_num_transfers(4),
            writer: ep_out.writer(FRAME_SIZE).with_num_transfers(4),
        })
    }
}

impl Transport for HidTransport {
    fn frame_out(&self, packet_bytes: &[u8]) -> Vec<u8> {
        frame_out(packet_bytes)
    }

    fn max_payload_size(&self) -> usize {
        HID_MAX_PAYLOAD_SIZE
    }

    async fn write_frame(&mut self, frame: &[u8], write_timeout: Duration) -> Result<(), AmfiprotError> {
        timeout(write_timeout, self.writer.write_all(frame)).await??;
        timeout(write_timeout, self.writer.flush_end_async()).await??;
        Ok(())
    }

    async fn read_one_frame(&mut self, read_timeout: Duration) -> Result<Option<Vec<u8>>, AmfiprotError> {
        let mut report = vec![0u8; FRAME_SIZE];
        match timeout(read_timeout, self.reader.read(&mut report)).await {
            Err(_) => Ok(None),
            Ok(result) => {
                let n = result?;
                Ok(Some(deframe_in(&report[..n]).to_vec()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_out_prepends_report_id_and_pads() {
        let framed = frame_out(&[0xAA, 0xBB]);
        assert_eq!(framed.len(), FRAME_SIZE);
        assert_eq!(framed[0], REPORT_ID);
        assert_eq!(&framed[1..3], &[0xAA, 0xBB]);
        assert!(framed[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn deframe_in_skips_report_metadata() {
        let mut report = vec![0u8; FRAME_SIZE];
        report[2] = 0x42;
        report[3] = 0x43;
        assert_eq!(deframe_in(&report)[0..2], [0x42, 0x43]);
    }

    #[test]
    fn deframe_in_handles_short_reports() {
        assert_eq!(deframe_in(&[0x01]), &[] as &[u8]);
    }

    #[test]
    fn max_payload_size_matches_frame_budget() {
        assert_eq!(HID_MAX_PAYLOAD_SIZE, 54);
    }
}
