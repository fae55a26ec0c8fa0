//! UART transport: COBS framing with a trailing `0x00` terminator.
//!
//! The core only defines the framing and a port abstraction; wiring up a
//! concrete serial device (e.g. `tokio-serial`) is left to the application,
//! which supplies a [`SerialPort`] implementation.

use crate::error::AmfiprotError;
use crate::transport::Transport;
use std::time::Duration;
use tokio::time::timeout;

/// Largest payload a COBS frame can carry, matching the HID transport's budget
/// so application code can size buffers uniformly across transports.
pub const UART_MAX_PAYLOAD_SIZE: usize = 54;

/// COBS-encodes `packet_bytes`, including the trailing `0x00` terminator.
pub fn frame_out(packet_bytes: &[u8]) -> Vec<u8> {
    let mut encoded = vec![0u8; corncobs::max_encoded_len(packet_bytes.len())];
    let len = corncobs::encode_buf(packet_bytes, &mut encoded);
    encoded.truncate(len);
    encoded
}

/// COBS-decodes a frame that still carries its trailing `0x00` terminator.
pub fn deframe_in(frame: &[u8]) -> Result<Vec<u8>, AmfiprotError> {
    let mut decoded = vec![0u8; frame.len()];
    let len = corncobs::decode_buf(frame, &mut decoded)
        .map_err(|e| AmfiprotError::ParseError(format!("COBS decode failed: {e:?}")))?;
    decoded.truncate(len);
    Ok(decoded)
}

/// The minimal byte-stream operations a UART transport needs from an OS
/// serial port. Implementations own the concrete device; the core only reads
/// and writes bytes.
pub trait SerialPort: Send {
    fn write_all(
        &mut self,
        bytes: &[u8],
    ) -> impl std::future::Future<Output = Result<(), AmfiprotError>> + Send;

    /// Reads a single byte. Used to scan for the `0x00` frame terminator.
    fn read_byte(&mut self) -> impl std::future::Future<Output = Result<u8, AmfiprotError>> + Send;
}

/// A [`Transport`] over any [`SerialPort`], framing packets with COBS.
pub struct UartTransport<P: SerialPort> {
    port: P,
    read_buf: Vec<u8>,
}

impl<P: SerialPort> UartTransport<P> {
    pub fn new(port: P) -> Self {
        Self { port, read_buf: Vec::with_capacity(128) }
    }
}

impl<P: SerialPort> Transport for UartTransport<P> {
    fn frame_out(&self, packet_bytes: &[u8]) -> Vec<u8> {
        frame_out(packet_bytes)
    }

    fn max_payload_size(&self) -> usize {
        UART_MAX_PAYLOAD_SIZE
    }

    async fn write_frame(&mut self, frame: &[u8], write_timeout: Duration) -> Result<(), AmfiprotError> {
        timeout(write_timeout, self.port.write_all(frame)).await??;
        Ok(())
    }

    async fn read_one_frame(&mut self, read_timeout: Duration) -> Result<Option<Vec<u8>>, AmfiprotError> {
        let result = timeout(read_timeout, async {
            loop {
                let byte = self.port.read_byte().await?;
                self.read_buf.push(byte);
                if byte == 0x00 {
                    let frame = std::mem::take(&mut self.read_buf);
                    return Ok(deframe_in(&frame)?);
                }
            }
        })
        .await;

        match result {
            Err(_) => Ok(None),
            Ok(inner) => inner.map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_cobs_framing() {
        let packet = [0x07, 0x00, 0x42, 0x00, 0x01, 0x02, 0x9A];
        let frame = frame_out(&packet);
        assert_eq!(*frame.last().unwrap(), 0x00);
        let decoded = deframe_in(&frame).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn round_trips_data_containing_zero_bytes() {
        let packet = [0x00, 0x00, 0x00, 0xFF, 0x00];
        let frame = frame_out(&packet);
        assert_eq!(deframe_in(&frame).unwrap(), packet);
    }
}
