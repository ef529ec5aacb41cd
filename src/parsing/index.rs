//! Block index parser.
//!
//! The index sits between the last block and the stream footer and lists
//! one record per block: unpadded size and uncompressed size. Offsets are
//! not stored; they follow from summing the padded sizes in order.

use crate::crc::{crc32, crc32_matches};
use crate::error::{ExtractError, Result};
use crate::parsing::vli::{encode_vli, VliReader};

/// Index indicator byte. A block header can never start with it.
pub const INDEX_INDICATOR: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    /// Header + compressed data + check, without block padding.
    pub unpadded_size: u64,
    pub uncompressed_size: u64,
}

impl IndexRecord {
    /// Size the block occupies in the file.
    pub fn total_size(&self) -> u64 {
        (self.unpadded_size + 3) & !3
    }
}

pub struct IndexParser;

impl IndexParser {
    /// Indicator + count + padding-to-4 + CRC32.
    const MIN_SIZE: usize = 8;

    pub fn parse(buffer: &[u8]) -> Result<Vec<IndexRecord>> {
        if buffer.len() < Self::MIN_SIZE {
            return Err(ExtractError::BufferTooSmall {
                needed: Self::MIN_SIZE,
                have: buffer.len(),
            });
        }
        if buffer.len() % 4 != 0 {
            return Err(ExtractError::InvalidHeader("index (size not a multiple of 4)"));
        }

        let (body, stored_crc) = buffer.split_at(buffer.len() - 4);
        if !crc32_matches(body, stored_crc) {
            return Err(ExtractError::InvalidHeader("index (CRC mismatch)"));
        }

        let mut reader = VliReader::new(body);
        if reader.read_u8() != Some(INDEX_INDICATOR) {
            return Err(ExtractError::InvalidHeader("index (missing indicator)"));
        }
        let count = reader
            .read()
            .ok_or(ExtractError::InvalidHeader("index (record count)"))?;

        // Each record is at least two bytes.
        if count > (body.len() / 2) as u64 {
            return Err(ExtractError::InvalidHeader("index (record count)"));
        }

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let unpadded_size = reader
                .read()
                .ok_or(ExtractError::InvalidHeader("index record"))?;
            let uncompressed_size = reader
                .read()
                .ok_or(ExtractError::InvalidHeader("index record"))?;
            if unpadded_size < 5 {
                return Err(ExtractError::InvalidHeader("index record (unpadded size)"));
            }
            records.push(IndexRecord {
                unpadded_size,
                uncompressed_size,
            });
        }

        let padding = reader.remaining();
        if padding.len() > 3 || padding.iter().any(|&b| b != 0) {
            return Err(ExtractError::InvalidHeader("index (padding)"));
        }

        Ok(records)
    }

    /// Serialize an index, including padding and CRC32.
    pub fn encode(records: &[IndexRecord]) -> Vec<u8> {
        let mut out = vec![INDEX_INDICATOR];
        encode_vli(records.len() as u64, &mut out);
        for record in records {
            encode_vli(record.unpadded_size, &mut out);
            encode_vli(record.uncompressed_size, &mut out);
        }
        while out.len() % 4 != 0 {
            out.push(0);
        }
        let crc = crc32(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        let records = vec![
            IndexRecord {
                unpadded_size: 1021,
                uncompressed_size: 4096,
            },
            IndexRecord {
                unpadded_size: 64,
                uncompressed_size: 100,
            },
        ];
        let encoded = IndexParser::encode(&records);
        assert_eq!(encoded.len() % 4, 0);
        assert_eq!(IndexParser::parse(&encoded).unwrap(), records);
        assert_eq!(records[0].total_size(), 1024);
        assert_eq!(records[1].total_size(), 64);
    }

    #[test]
    fn test_empty_index() {
        let encoded = IndexParser::encode(&[]);
        assert_eq!(encoded.len(), 8);
        assert!(IndexParser::parse(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_index() {
        let mut encoded = IndexParser::encode(&[IndexRecord {
            unpadded_size: 40,
            uncompressed_size: 10,
        }]);
        encoded[2] ^= 0x01;
        assert!(matches!(
            IndexParser::parse(&encoded),
            Err(ExtractError::InvalidHeader(_))
        ));
    }
}
