//! Stream footer parser.
//!
//! The footer closes an xz stream and tells where the index starts:
//! CRC32 (of the next 6 bytes), backward size, stream flags, magic `YZ`.

use crate::crc::{crc32, crc32_matches};
use crate::error::{ExtractError, Result};
use crate::parsing::stream_header::StreamFlags;

/// Footer magic.
pub const FOOTER_MAGIC: [u8; 2] = [0x59, 0x5A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFooter {
    /// Size of the index in bytes.
    pub index_size: u64,
    pub flags: StreamFlags,
}

pub struct StreamFooterParser;

impl StreamFooterParser {
    pub const HEADER_SIZE: usize = 12;

    pub fn parse(buffer: &[u8]) -> Result<StreamFooter> {
        if buffer.len() < Self::HEADER_SIZE {
            return Err(ExtractError::BufferTooSmall {
                needed: Self::HEADER_SIZE,
                have: buffer.len(),
            });
        }

        if buffer[10..12] != FOOTER_MAGIC {
            return Err(ExtractError::InvalidHeader("stream footer (bad magic)"));
        }
        if !crc32_matches(&buffer[4..10], &buffer[0..4]) {
            return Err(ExtractError::InvalidHeader("stream footer (CRC mismatch)"));
        }

        let backward = u32::from_le_bytes([buffer[4], buffer[5], buffer[6], buffer[7]]);
        let flags = StreamFlags::parse([buffer[8], buffer[9]])?;

        Ok(StreamFooter {
            index_size: (u64::from(backward) + 1) * 4,
            flags,
        })
    }

    /// Serialize a footer for an index of `index_size` bytes (a multiple of 4).
    pub fn encode(index_size: u64, flags: StreamFlags) -> [u8; Self::HEADER_SIZE] {
        let mut out = [0u8; Self::HEADER_SIZE];
        let backward = (index_size / 4 - 1) as u32;
        out[4..8].copy_from_slice(&backward.to_le_bytes());
        out[8..10].copy_from_slice(&flags.to_bytes());
        out[10..12].copy_from_slice(&FOOTER_MAGIC);
        let crc = crc32(&out[4..10]);
        out[0..4].copy_from_slice(&crc.to_le_bytes());
        out
    }
}
