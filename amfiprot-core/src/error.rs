use std::io;
use thiserror::Error;

/// The primary error type for the `amfiprot-core` library.
#[derive(Error, Debug)]
pub enum AmfiprotError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("timeout waiting for reply")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("no connected endpoint matched the request")]
    ConnectionError,

    #[error("malformed packet: {0}")]
    ParseError(String),

    #[error("unknown common payload ID: {0:#04x}")]
    InvalidCommonId(u8),

    #[error("insufficient data: expected at least {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("config write mismatch on uid {uid}: wrote {written:?}, read back {read_back:?}")]
    ConfigWriteMismatch {
        uid: u32,
        written: Vec<u8>,
        read_back: Vec<u8>,
    },

    #[error("firmware transfer failed at step {step}: {message}")]
    FirmwareTransferError { step: &'static str, message: String },

    #[error("unknown endpoint tx_id {0}")]
    UnknownEndpoint(u8),
}
