//! Frame checksums
//!
//! - **CRC-16/MODBUS** for RTU frames: polynomial 0xA001 (reflected 0x8005),
//!   initial value 0xFFFF, transmitted low byte first.
//! - **LRC** for ASCII frames: two's complement of the 8-bit sum of the raw
//!   bytes, transmitted as two hex characters.
//!
//! ```rust
//! use voltage_modbus_codec::checksum::{crc16, validate_crc};
//!
//! let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0xC4, 0x0B];
//! assert_eq!(crc16(&frame[..6]).to_le_bytes(), [0xC4, 0x0B]);
//! assert!(validate_crc(&frame));
//! ```

use crc::{Crc, CRC_16_MODBUS};

/// CRC calculator for RTU
const CRC_MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Number of checksum bytes trailing an RTU frame
pub const CRC_LEN: usize = 2;

/// Calculate the CRC-16/MODBUS of `data`
///
/// The wire representation is `crc16(data).to_le_bytes()`.
pub fn crc16(data: &[u8]) -> u16 {
    CRC_MODBUS.checksum(data)
}

/// Read the CRC carried in the last two bytes of an RTU frame
pub fn trailing_crc(frame: &[u8]) -> Option<u16> {
    let split = frame.len().checked_sub(CRC_LEN)?;
    Some(u16::from_le_bytes([frame[split], frame[split + 1]]))
}

/// Validate the CRC of a complete RTU frame
///
/// Frames shorter than unit id + function code + CRC never validate.
pub fn validate_crc(frame: &[u8]) -> bool {
    if frame.len() < 2 + CRC_LEN {
        return false;
    }

    let data_len = frame.len() - CRC_LEN;
    trailing_crc(frame) == Some(crc16(&frame[..data_len]))
}

/// Calculate the LRC of the raw (not hex-encoded) ASCII frame content
pub fn lrc(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |sum, &b| sum.wrapping_add(b))
        .wrapping_neg()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_known_vectors() {
        let test_cases: Vec<(Vec<u8>, [u8; 2])> = vec![
            (vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02], [0xC4, 0x0B]),
            (vec![0x01, 0x06, 0x00, 0x01, 0x00, 0x03], [0x98, 0x0B]),
            (vec![0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B], [0x9B, 0xF6]),
            (vec![0x01, 0x01, 0x01, 0xCD], [0x90, 0x1D]),
            (vec![0x01, 0x83, 0x02], [0xC0, 0xF1]),
        ];

        for (data, expected) in test_cases {
            assert_eq!(
                crc16(&data).to_le_bytes(),
                expected,
                "CRC mismatch for {:02X?}",
                data
            );
        }
    }

    #[test]
    fn test_crc_matches_bitwise_reference() {
        fn reference(data: &[u8]) -> u16 {
            let mut crc = 0xFFFFu16;
            for byte in data {
                crc ^= *byte as u16;
                for _ in 0..8 {
                    if crc & 0x0001 != 0 {
                        crc = (crc >> 1) ^ 0xA001;
                    } else {
                        crc >>= 1;
                    }
                }
            }
            crc
        }

        let data: Vec<u8> = (0u8..=255).collect();
        assert_eq!(crc16(&data), reference(&data));
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_validate_crc() {
        let frame = [0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B, 0x9B, 0xF6];
        assert!(validate_crc(&frame));
        assert_eq!(trailing_crc(&frame), Some(0xF69B));

        let mut corrupted = frame;
        corrupted[8] ^= 0xFF;
        assert!(!validate_crc(&corrupted));

        assert!(!validate_crc(&[0x01, 0x03, 0xFF]));
        assert_eq!(trailing_crc(&[0x01]), None);
    }

    #[test]
    fn test_lrc_calculation() {
        let data = [0x01, 0x03, 0x00, 0x00, 0x00, 0x02];
        assert_eq!(lrc(&data), 0xFA);

        // Sum wraps past 0xFF
        let data = [0xF7, 0x03, 0x13, 0x89, 0x00, 0x0A];
        let sum: u32 = data.iter().map(|&b| b as u32).sum();
        assert_eq!(lrc(&data), (0x100 - (sum % 0x100)) as u8);
        assert_eq!(lrc(&data).wrapping_add(data.iter().fold(0u8, |s, &b| s.wrapping_add(b))), 0);
    }
}
