//! Container reader: stream header, footer, block index and file index.

use crate::decompress::{BlockDecoder, Check, XzBlockDecoder};
use crate::error::{ExtractError, Result};
use crate::file_index::FileIndex;
use crate::file_media::{read_interval, zeroed_buffer, ReadInterval};
use crate::parsing::{BlockHeaderParser, IndexParser, StreamFlags, StreamFooterParser, StreamHeaderParser};
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Largest uncompressed block the reader will allocate for.
pub const MAX_BLOCK_SIZE: u64 = 1 << 30;

/// Where one compressed block lives and what it expands to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// 1-based block number, in file order.
    pub number: u64,
    pub compressed_offset: u64,
    /// Bytes occupied in the file, block padding included.
    pub total_size: u64,
    pub unpadded_size: u64,
    pub uncompressed_offset: u64,
    pub uncompressed_size: u64,
}

impl BlockDescriptor {
    pub fn uncompressed_end(&self) -> u64 {
        self.uncompressed_offset + self.uncompressed_size
    }

    pub fn compressed_interval(&self) -> ReadInterval {
        ReadInterval::new(self.compressed_offset, self.total_size)
    }
}

/// A parsed xz stream: its blocks and, for pixz archives, the file index.
#[derive(Debug, Clone)]
pub struct Container {
    flags: StreamFlags,
    blocks: Vec<BlockDescriptor>,
    file_index: Option<FileIndex>,
    /// Compressed offset of the block holding the file index.
    file_index_offset: Option<u64>,
}

impl Container {
    /// Parse the container structure of a single-stream xz file.
    pub fn open<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Self> {
        let length = reader.seek(SeekFrom::End(0))?;
        let header_size = StreamHeaderParser::HEADER_SIZE as u64;
        let footer_size = StreamFooterParser::HEADER_SIZE as u64;
        if length < header_size {
            return Err(ExtractError::BufferTooSmall {
                needed: StreamHeaderParser::HEADER_SIZE,
                have: length as usize,
            });
        }

        let header = read_interval(reader, ReadInterval::new(0, header_size))?;
        let flags = StreamHeaderParser::parse(&header)?;

        let stream_end = Self::skip_stream_padding(reader, length)?;
        if stream_end < header_size + footer_size {
            return Err(ExtractError::InvalidHeader("stream (too short)"));
        }
        let footer = read_interval(
            reader,
            ReadInterval::new(stream_end - footer_size, footer_size),
        )?;
        let footer = StreamFooterParser::parse(&footer)?;
        if footer.flags != flags {
            return Err(ExtractError::InvalidHeader("stream footer (flags differ from header)"));
        }

        let index_end = stream_end - footer_size;
        let index_start = index_end
            .checked_sub(footer.index_size)
            .filter(|&start| start >= header_size)
            .ok_or(ExtractError::InvalidHeader("stream footer (backward size)"))?;
        let index = read_interval(reader, ReadInterval::new(index_start, footer.index_size))?;
        let records = IndexParser::parse(&index)?;

        let mut blocks = Vec::with_capacity(records.len());
        let mut compressed_offset = header_size;
        let mut uncompressed_offset = 0u64;
        for (i, record) in records.iter().enumerate() {
            if record.uncompressed_size > MAX_BLOCK_SIZE {
                return Err(ExtractError::InvalidHeader(
                    "block index (uncompressed block too large)",
                ));
            }
            blocks.push(BlockDescriptor {
                number: i as u64 + 1,
                compressed_offset,
                total_size: record.total_size(),
                unpadded_size: record.unpadded_size,
                uncompressed_offset,
                uncompressed_size: record.uncompressed_size,
            });
            compressed_offset = compressed_offset
                .checked_add(record.total_size())
                .ok_or(ExtractError::InvalidHeader("block index (sizes overflow)"))?;
            uncompressed_offset += record.uncompressed_size;
        }
        if compressed_offset != index_start {
            // Either concatenated streams or a corrupt index.
            return Err(ExtractError::InvalidHeader(
                "block index (blocks do not fill the stream)",
            ));
        }
        debug!(
            blocks = blocks.len(),
            uncompressed = uncompressed_offset,
            check = ?flags.check,
            "parsed block index"
        );

        let mut container = Self {
            flags,
            blocks,
            file_index: None,
            file_index_offset: None,
        };
        container.load_file_index(reader)?;
        Ok(container)
    }

    /// Offset just past the stream footer, with trailing zero padding removed.
    fn skip_stream_padding<R: Read + Seek + ?Sized>(reader: &mut R, length: u64) -> Result<u64> {
        if length % 4 != 0 {
            return Err(ExtractError::InvalidHeader("stream padding"));
        }
        let mut end = length;
        while end >= 4 {
            let word = read_interval(reader, ReadInterval::new(end - 4, 4))?;
            if word != [0, 0, 0, 0] {
                break;
            }
            end -= 4;
        }
        if end != length {
            debug!(padding = length - end, "skipped stream padding");
        }
        Ok(end)
    }

    /// Decode the last block and keep it as the file index if it carries the magic.
    fn load_file_index<R: Read + Seek + ?Sized>(&mut self, reader: &mut R) -> Result<()> {
        let Some(last) = self.blocks.last().copied() else {
            return Ok(());
        };

        let input = read_interval(reader, last.compressed_interval())?;
        let header =
            BlockHeaderParser::parse(&input).map_err(|e| ExtractError::decode(last.number, e))?;
        if header
            .uncompressed_size
            .is_some_and(|size| size != last.uncompressed_size)
        {
            return Err(ExtractError::InvalidHeader(
                "block header (size differs from block index)",
            ));
        }
        let mut output = zeroed_buffer(last.uncompressed_size)?;
        let decoder = XzBlockDecoder::new(self.flags.check);
        let produced = decoder
            .decode_block(&input, &mut output)
            .map_err(|e| ExtractError::decode(last.number, e))?;
        output.truncate(produced);

        match FileIndex::parse(&output)? {
            Some(index) => {
                if index.end() > last.uncompressed_offset {
                    warn!(
                        end = index.end(),
                        data = last.uncompressed_offset,
                        "file index extends past the archive data"
                    );
                }
                debug!(
                    entries = index.len(),
                    block = last.number,
                    "found file index"
                );
                self.file_index = Some(index);
                self.file_index_offset = Some(last.compressed_offset);
            }
            None => debug!("no file index, plain xz stream"),
        }
        Ok(())
    }

    pub fn check(&self) -> Check {
        self.flags.check
    }

    /// Every block in the stream, the file-index block included.
    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.blocks
    }

    pub fn file_index(&self) -> Option<&FileIndex> {
        self.file_index.as_ref()
    }

    pub fn file_index_offset(&self) -> Option<u64> {
        self.file_index_offset
    }

    /// Whether `block` is the metadata block holding the file index.
    pub fn is_metadata(&self, block: &BlockDescriptor) -> bool {
        self.file_index_offset == Some(block.compressed_offset)
    }

    /// Blocks carrying archive data.
    pub fn data_blocks(&self) -> impl Iterator<Item = &BlockDescriptor> + '_ {
        self.blocks.iter().filter(move |block| !self.is_metadata(block))
    }

    /// Uncompressed size of the archive data, file index excluded.
    pub fn data_size(&self) -> u64 {
        self.data_blocks().map(|block| block.uncompressed_size).sum()
    }
}
