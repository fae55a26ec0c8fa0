pub mod config;
pub mod connection;
pub mod constants;
pub mod crc;
pub mod device;
pub mod endpoint;
pub mod error;
pub mod firmware;
pub mod packet;
pub mod payload;
pub mod transport;
pub mod uuid;
pub mod worker;

pub use connection::Connection;
pub use device::Device;
pub use endpoint::{Endpoint, EndpointId};
pub use error::AmfiprotError;
pub use packet::{Packet, PacketKind};
pub use payload::{CommonPayload, Payload};
pub use transport::Transport;
pub use uuid::DeviceUuid;
