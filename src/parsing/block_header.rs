//! Block header parser.
//!
//! Every xz block starts with a header describing its filter chain and,
//! optionally, its compressed and uncompressed sizes. The first byte
//! encodes the header length; a first byte of `0x00` is the index
//! indicator, never a block.

use crate::crc::{crc32, crc32_matches};
use crate::decompress::{DecodeError, Result};
use crate::parsing::vli::{encode_vli, VliReader};

pub const FILTER_DELTA: u64 = 0x03;
pub const FILTER_X86: u64 = 0x04;
pub const FILTER_POWERPC: u64 = 0x05;
pub const FILTER_IA64: u64 = 0x06;
pub const FILTER_ARM: u64 = 0x07;
pub const FILTER_ARMTHUMB: u64 = 0x08;
pub const FILTER_SPARC: u64 = 0x09;
pub const FILTER_LZMA2: u64 = 0x21;

/// One entry of the filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterFlags {
    pub id: u64,
    pub props: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Header length in bytes, CRC included.
    pub header_size: usize,
    pub compressed_size: Option<u64>,
    pub uncompressed_size: Option<u64>,
    /// Filters in encoder order; the last one is the compressor.
    pub filters: Vec<FilterFlags>,
}

pub struct BlockHeaderParser;

impl BlockHeaderParser {
    /// Header length announced by the first byte, `None` for the index indicator.
    #[inline]
    pub fn header_size(first_byte: u8) -> Option<usize> {
        if first_byte == 0 {
            None
        } else {
            Some((usize::from(first_byte) + 1) * 4)
        }
    }

    pub fn parse(buffer: &[u8]) -> Result<BlockHeader> {
        let first = *buffer.first().ok_or(DecodeError::UnexpectedEof)?;
        let header_size =
            Self::header_size(first).ok_or(DecodeError::InvalidHeader("index indicator"))?;
        let header = buffer
            .get(..header_size)
            .ok_or(DecodeError::UnexpectedEof)?;

        let (body, stored_crc) = header.split_at(header_size - 4);
        if !crc32_matches(body, stored_crc) {
            return Err(DecodeError::InvalidHeader("CRC mismatch"));
        }

        let mut reader = VliReader::new(&body[1..]);
        let flags = reader
            .read_u8()
            .ok_or(DecodeError::InvalidHeader("flags"))?;
        if flags & 0x3C != 0 {
            return Err(DecodeError::InvalidHeader("reserved flags set"));
        }
        let filter_count = usize::from(flags & 0x03) + 1;

        let compressed_size = if flags & 0x40 != 0 {
            let size = reader
                .read()
                .ok_or(DecodeError::InvalidHeader("compressed size"))?;
            if size == 0 {
                return Err(DecodeError::InvalidHeader("compressed size"));
            }
            Some(size)
        } else {
            None
        };
        let uncompressed_size = if flags & 0x80 != 0 {
            Some(
                reader
                    .read()
                    .ok_or(DecodeError::InvalidHeader("uncompressed size"))?,
            )
        } else {
            None
        };

        let mut filters = Vec::with_capacity(filter_count);
        for _ in 0..filter_count {
            let id = reader
                .read()
                .ok_or(DecodeError::InvalidHeader("filter id"))?;
            let props_size = reader
                .read()
                .ok_or(DecodeError::InvalidHeader("filter properties size"))?;
            let props = reader
                .read_bytes(props_size as usize)
                .ok_or(DecodeError::InvalidHeader("filter properties"))?;
            filters.push(FilterFlags {
                id,
                props: props.to_vec(),
            });
        }

        if reader.remaining().iter().any(|&b| b != 0) {
            return Err(DecodeError::InvalidHeader("padding"));
        }

        Ok(BlockHeader {
            header_size,
            compressed_size,
            uncompressed_size,
            filters,
        })
    }

    /// Serialize a block header, padding it to a multiple of four.
    pub fn encode(header: &BlockHeader) -> Vec<u8> {
        let mut out = vec![0u8];
        let mut flags = (header.filters.len().saturating_sub(1) & 0x03) as u8;
        if header.compressed_size.is_some() {
            flags |= 0x40;
        }
        if header.uncompressed_size.is_some() {
            flags |= 0x80;
        }
        out.push(flags);
        if let Some(size) = header.compressed_size {
            encode_vli(size, &mut out);
        }
        if let Some(size) = header.uncompressed_size {
            encode_vli(size, &mut out);
        }
        for filter in &header.filters {
            encode_vli(filter.id, &mut out);
            encode_vli(filter.props.len() as u64, &mut out);
            out.extend_from_slice(&filter.props);
        }
        while (out.len() + 4) % 4 != 0 {
            out.push(0);
        }
        out[0] = ((out.len() + 4) / 4 - 1) as u8;
        let crc = crc32(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }
}
