//! Protocol constants for Amfiprot.

/// Size of the packet header in bytes (everything up to and including `header_crc`).
pub const HEADER_SIZE: usize = 7;

/// CRC-8 polynomial in 9-bit representation (generator `0x2F` in 8-bit form).
pub const CRC_POLY: u8 = 0x2F;

/// `destination_tx_id` / `source_tx_id` value reserved for the host.
pub const HOST_TX_ID: u8 = 0;

/// `destination_tx_id` value meaning "broadcast to all endpoints".
pub const BROADCAST_TX_ID: u8 = 255;

/// Byte width of a device UUID on the wire.
pub const UUID_SIZE: usize = 12;

/// Default capacity of the global inbox and of each per-endpoint inbox.
pub const DEFAULT_INBOX_CAPACITY: usize = 128;

/// Default deadline for a typed request/reply exchange.
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 1000;

/// Deadline for firmware-transfer steps (start/each chunk).
pub const FIRMWARE_STEP_TIMEOUT_MS: u64 = 10_000;

/// Default write timeout applied by the transport worker when draining the transmit queue.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;

/// Short read timeout used by the transport worker's polling loop.
pub const WORKER_READ_TIMEOUT_MS: u64 = 1;

/// Interval at which the worker polls for a disconnected device to reappear.
pub const RECONNECT_POLL_INTERVAL_MS: u64 = 1000;

/// Discovery collection window (time to wait for `REPLY_DEVICE_ID`/`REPLY_DEVICE_NAME`).
pub const DISCOVERY_WINDOW_MS: u64 = 1000;

/// Number of bytes subtracted from a transport's max payload size to derive the
/// firmware chunk size (one byte for `processor_id`, one for the common-payload ID).
pub const FIRMWARE_CHUNK_OVERHEAD: usize = 2;

/// Fixed width of a single RPC parameter slot: 1 type tag byte + 8 value bytes.
pub const RPC_PARAM_SLOT_SIZE: usize = 9;

/// Number of RPC parameter slots always serialized in a procedure call.
pub const RPC_PARAM_SLOTS: usize = 5;

/// `RESET_PARAMETER` mode value selecting compiled-in defaults rather than factory defaults.
pub const RESET_MODE_COMPILED_DEFAULTS: u8 = 171;
