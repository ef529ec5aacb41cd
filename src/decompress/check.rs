//! Integrity checks stored after each block's compressed data.

use crate::crc::{crc32, crc64};
use sha2::{Digest, Sha256};

/// Check type declared in the stream flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Check {
    None = 0x00,
    Crc32 = 0x01,
    Crc64 = 0x04,
    Sha256 = 0x0A,
}

impl Check {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Crc32),
            0x04 => Some(Self::Crc64),
            0x0A => Some(Self::Sha256),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Number of check bytes stored after each block.
    pub fn size(self) -> usize {
        match self {
            Self::None => 0,
            Self::Crc32 => 4,
            Self::Crc64 => 8,
            Self::Sha256 => 32,
        }
    }

    /// Compute the check over decoded data, in stored byte order.
    pub fn compute(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => Vec::new(),
            Self::Crc32 => crc32(data).to_le_bytes().to_vec(),
            Self::Crc64 => crc64(data).to_le_bytes().to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
        }
    }

    pub fn verify(self, data: &[u8], stored: &[u8]) -> bool {
        stored.len() == self.size() && self.compute(data) == stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_id() {
        assert_eq!(Check::from_id(0x0A), Some(Check::Sha256));
        assert_eq!(Check::from_id(0x02), None);
        for check in [Check::None, Check::Crc32, Check::Crc64, Check::Sha256] {
            assert_eq!(Check::from_id(check.id()), Some(check));
            assert_eq!(check.compute(b"abc").len(), check.size());
        }
    }

    #[test]
    fn test_verify() {
        let stored = Check::Crc32.compute(b"123456789");
        assert_eq!(stored, 0xCBF43926_u32.to_le_bytes());
        assert!(Check::Crc32.verify(b"123456789", &stored));
        assert!(!Check::Crc64.verify(b"123456789", &stored));
        assert!(Check::None.verify(b"anything", &[]));
    }
}
