//! 96-bit device identifier with the protocol's wire-level block reversal.
//!
//! On the wire the 12 bytes of a UUID are three big-endian `u32` blocks in
//! reverse order: the *low* 32-bit block of the logical value is transmitted
//! first, each block's own bytes staying big-endian internally. This applies
//! to `REPLY_DEVICE_ID`, `SET_TX_ID`, and `SAVE_AS_DEFAULT`.

use crate::error::AmfiprotError;

/// A 96-bit device UUID, stored as three 32-bit limbs, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceUuid {
    limbs: [u32; 3],
}

impl DeviceUuid {
    pub fn from_limbs(high: u32, mid: u32, low: u32) -> Self {
        Self {
            limbs: [high, mid, low],
        }
    }

    pub fn limbs(&self) -> [u32; 3] {
        self.limbs
    }

    /// Decodes a UUID from its 12-byte wire representation (block-reversed).
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, AmfiprotError> {
        if bytes.len() != 12 {
            return Err(AmfiprotError::InsufficientData {
                expected: 12,
                actual: bytes.len(),
            });
        }
        let low = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let mid = u32::from_be_bytes(bytes[4..8].try_into().unwrap());
        let high = u32::from_be_bytes(bytes[8..12].try_into().unwrap());
        Ok(Self::from_limbs(high, mid, low))
    }

    /// Encodes this UUID into its 12-byte wire representation (block-reversed).
    pub fn to_wire_bytes(self) -> [u8; 12] {
        let [high, mid, low] = self.limbs;
        let mut out = [0u8; 12];
        out[0..4].copy_from_slice(&low.to_be_bytes());
        out[4..8].copy_from_slice(&mid.to_be_bytes());
        out[8..12].copy_from_slice(&high.to_be_bytes());
        out
    }
}

impl std::fmt::Display for DeviceUuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [high, mid, low] = self.limbs;
        write!(f, "{high:08X}{mid:08X}{low:08X}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_reversal_reference_example() {
        // Logical UUID 0x0102030405060708090A0B0C split into three 32-bit limbs,
        // high-to-low: 0x01020304, 0x05060708, 0x090A0B0C.
        let uuid = DeviceUuid::from_limbs(0x0102_0304, 0x0506_0708, 0x090A_0B0C);
        let wire = uuid.to_wire_bytes();
        assert_eq!(
            wire,
            [0x09, 0x0A, 0x0B, 0x0C, 0x05, 0x06, 0x07, 0x08, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn round_trips_through_wire_bytes() {
        let uuid = DeviceUuid::from_limbs(0xDEAD_BEEF, 0x1234_5678, 0x0000_0001);
        let decoded = DeviceUuid::from_wire_bytes(&uuid.to_wire_bytes()).unwrap();
        assert_eq!(uuid, decoded);
    }

    #[test]
    fn rejects_short_input() {
        assert!(DeviceUuid::from_wire_bytes(&[0u8; 11]).is_err());
    }
}
