//! Stream header parser - xz signature and stream flags.
//!
//! The stream header is the first 12 bytes of an xz file:
//! magic `FD 37 7A 58 5A 00`, two flag bytes (`00`, check id) and the
//! CRC32 of the flag bytes.

use crate::crc::{crc32, crc32_matches};
use crate::decompress::Check;
use crate::error::{ExtractError, Result};

/// xz magic signature.
pub const XZ_SIGNATURE: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];

/// Stream flags shared by the header and the footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFlags {
    pub check: Check,
}

impl StreamFlags {
    /// Parse the two flag bytes.
    pub fn parse(bytes: [u8; 2]) -> Result<Self> {
        if bytes[0] != 0 || bytes[1] & 0xF0 != 0 {
            return Err(ExtractError::InvalidHeader("stream flags"));
        }
        let check = Check::from_id(bytes[1])
            .ok_or(ExtractError::InvalidHeader("stream flags (unsupported check)"))?;
        Ok(Self { check })
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [0, self.check.id()]
    }
}

pub struct StreamHeaderParser;

impl StreamHeaderParser {
    pub const HEADER_SIZE: usize = 12;

    pub fn parse(buffer: &[u8]) -> Result<StreamFlags> {
        if buffer.len() < Self::HEADER_SIZE {
            return Err(ExtractError::BufferTooSmall {
                needed: Self::HEADER_SIZE,
                have: buffer.len(),
            });
        }

        if buffer[..6] != XZ_SIGNATURE {
            return Err(ExtractError::InvalidSignature);
        }

        if !crc32_matches(&buffer[6..8], &buffer[8..12]) {
            return Err(ExtractError::InvalidHeader("stream header (CRC mismatch)"));
        }

        StreamFlags::parse([buffer[6], buffer[7]])
    }

    /// Serialize a stream header.
    pub fn encode(flags: StreamFlags) -> [u8; Self::HEADER_SIZE] {
        let mut out = [0u8; Self::HEADER_SIZE];
        out[..6].copy_from_slice(&XZ_SIGNATURE);
        out[6..8].copy_from_slice(&flags.to_bytes());
        let crc = crc32(&out[6..8]);
        out[8..12].copy_from_slice(&crc.to_le_bytes());
        out
    }
}
