//! CRC-8 as used for both the packet header and the payload body.
//!
//! Polynomial `0x12F` in its 9-bit form is the generator `0x2F` in the 8-bit
//! form `crc` expects. No reflection, no final XOR, init 0.

use crc::{Algorithm, Crc};

const ALGORITHM: Algorithm<u8> = Algorithm {
    width: 8,
    poly: crate::constants::CRC_POLY,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0x00,
    residue: 0x00,
};

static ENGINE: Crc<u8> = Crc::<u8>::new(&ALGORITHM);

/// Computes the protocol's CRC-8 over `data`.
pub fn crc8(data: &[u8]) -> u8 {
    ENGINE.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc8(&[]), 0x00);
    }

    #[test]
    fn single_zero_byte_is_zero() {
        assert_eq!(crc8(&[0x00]), 0x00);
    }

    #[test]
    fn is_deterministic() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        assert_eq!(crc8(&data), crc8(&data));
    }

    #[test]
    fn six_byte_vector_is_pinned() {
        // Computed from the polynomial 0x12F (generator 0x2F), init 0, non-reflected,
        // no xorout, matching the reference `crcmod.Crc(0x12F, initCrc=0, rev=False)`.
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        assert_eq!(crc8(&data), 0x37);
        // Recomputing byte-by-byte through the running-remainder algorithm must agree
        // with the table-driven engine above.
        assert_eq!(crc8(&data), crc8_naive(&data));
    }

    /// Bit-by-bit reference implementation used only to cross-check the `crc` crate's
    /// table-driven engine against the polynomial's definition.
    fn crc8_naive(data: &[u8]) -> u8 {
        let mut crc: u8 = 0x00;
        for &byte in data {
            crc ^= byte;
            for _ in 0..8 {
                if crc & 0x80 != 0 {
                    crc = (crc << 1) ^ crate::constants::CRC_POLY;
                } else {
                    crc <<= 1;
                }
            }
        }
        crc
    }
}
