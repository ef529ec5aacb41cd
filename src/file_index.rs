//! The pixz file index: member names mapped to uncompressed offsets.
//!
//! pixz appends one extra block to the stream whose payload is the file
//! index. Layout of the decoded payload:
//!
//! ```text
//! magic (u64 LE 0xDBAE14D62E324CA6)
//! { name bytes, NUL, offset (u64 LE) } ...
//! NUL, end offset (u64 LE)                 <- sentinel, empty name
//! ```
//!
//! Each entry's range runs from its own offset to the next entry's offset;
//! the sentinel's offset closes the last one.

use crate::error::{ExtractError, Result};

pub const FILE_INDEX_MAGIC: u64 = 0xDBAE14D62E324CA6;

/// A member of the archive and where its tar record starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndexEntry {
    pub name: String,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndex {
    entries: Vec<FileIndexEntry>,
    /// Offset carried by the sentinel.
    end: u64,
}

impl FileIndex {
    /// Build an index from entries in archive order and the sentinel offset.
    pub fn new(entries: Vec<FileIndexEntry>, end: u64) -> Result<Self> {
        let mut previous = 0;
        for entry in &entries {
            if entry.offset < previous {
                return Err(ExtractError::InvalidHeader("file index (offsets not ascending)"));
            }
            previous = entry.offset;
        }
        if end < previous {
            return Err(ExtractError::InvalidHeader("file index (offsets not ascending)"));
        }
        Ok(Self { entries, end })
    }

    /// Parse a decoded file-index payload.
    ///
    /// Returns `Ok(None)` when the payload does not start with the magic:
    /// the last block is ordinary data and the stream has no index.
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        let Some(magic) = data.get(..8) else {
            return Ok(None);
        };
        if read_u64_le(magic) != FILE_INDEX_MAGIC {
            return Ok(None);
        }

        let mut entries = Vec::new();
        let mut pos = 8;
        loop {
            let rest = &data[pos..];
            let name_len = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or(ExtractError::InvalidHeader("file index (unterminated name)"))?;
            let offset_bytes = rest
                .get(name_len + 1..name_len + 9)
                .ok_or(ExtractError::InvalidHeader("file index (truncated offset)"))?;
            let offset = read_u64_le(offset_bytes);
            pos += name_len + 9;

            if name_len == 0 {
                return Self::new(entries, offset).map(Some);
            }
            entries.push(FileIndexEntry {
                name: String::from_utf8_lossy(&rest[..name_len]).into_owned(),
                offset,
            });
        }
    }

    /// Serialize the index payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = FILE_INDEX_MAGIC.to_le_bytes().to_vec();
        for entry in &self.entries {
            out.extend_from_slice(entry.name.as_bytes());
            out.push(0);
            out.extend_from_slice(&entry.offset.to_le_bytes());
        }
        out.push(0);
        out.extend_from_slice(&self.end.to_le_bytes());
        out
    }

    pub fn entries(&self) -> &[FileIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset where the last entry ends.
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Entries paired with their ranges.
    pub fn iter_ranges(&self) -> impl Iterator<Item = (&FileIndexEntry, u64, u64)> + '_ {
        self.entries.iter().enumerate().map(move |(i, entry)| {
            let end = self
                .entries
                .get(i + 1)
                .map_or(self.end, |next| next.offset);
            (entry, entry.offset, end)
        })
    }
}

fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
