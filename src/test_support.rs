//! Fixture builders for tests: real xz blocks, containers and pixz-style
//! tarballs with a file index.

use crate::decompress::Check;
use crate::file_index::{FileIndex, FileIndexEntry};
use crate::parsing::block_header::FILTER_LZMA2;
use crate::parsing::{
    BlockHeader, BlockHeaderParser, FilterFlags, IndexParser, IndexRecord, StreamFlags,
    StreamFooterParser, StreamHeaderParser,
};
use liblzma::stream::{Action, Filters, LzmaOptions, Status, Stream};

/// Props byte for a 1 MiB dictionary.
const DICT_PROPS: u8 = 16;

/// Compress `data` as raw LZMA2 with liblzma.
fn lzma2_compress(data: &[u8]) -> Vec<u8> {
    let mut options = LzmaOptions::new_preset(6).unwrap();
    options.dict_size(1 << 20);
    let mut filters = Filters::new();
    filters.lzma2(&options);
    let mut stream = Stream::new_raw_encoder(&filters).unwrap();

    let mut out = Vec::with_capacity(data.len() / 2 + 4096);
    loop {
        if out.len() == out.capacity() {
            out.reserve(4096);
        }
        let consumed = stream.total_in() as usize;
        let status = stream
            .process_vec(&data[consumed..], &mut out, Action::Finish)
            .unwrap();
        if matches!(status, Status::StreamEnd) {
            return out;
        }
    }
}

/// One complete xz block (header, data, padding, check) for `data`.
pub fn encode_block(data: &[u8], check: Check) -> Vec<u8> {
    let compressed = lzma2_compress(data);
    let header = BlockHeader {
        header_size: 0,
        compressed_size: Some(compressed.len() as u64),
        uncompressed_size: Some(data.len() as u64),
        filters: vec![FilterFlags {
            id: FILTER_LZMA2,
            props: vec![DICT_PROPS],
        }],
    };

    let mut block = BlockHeaderParser::encode(&header);
    block.extend_from_slice(&compressed);
    while block.len() % 4 != 0 {
        block.push(0);
    }
    block.extend_from_slice(&check.compute(data));
    block
}

/// Assembles a single-stream xz file block by block.
pub struct ContainerBuilder {
    check: Check,
    body: Vec<u8>,
    records: Vec<IndexRecord>,
}

impl ContainerBuilder {
    pub fn new(check: Check) -> Self {
        Self {
            check,
            body: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn add_block(&mut self, data: &[u8]) -> &mut Self {
        let block = encode_block(data, self.check);
        // The encoded block is already padded; the index wants it unpadded.
        let header_size = BlockHeaderParser::header_size(block[0]).unwrap();
        let compressed = lzma2_compressed_len(&block);
        self.records.push(IndexRecord {
            unpadded_size: (header_size + compressed + self.check.size()) as u64,
            uncompressed_size: data.len() as u64,
        });
        self.body.extend_from_slice(&block);
        self
    }

    /// Make the block index claim `size` uncompressed bytes for the last block.
    pub fn claim_uncompressed_size(&mut self, size: u64) -> &mut Self {
        if let Some(record) = self.records.last_mut() {
            record.uncompressed_size = size;
        }
        self
    }

    /// Append the file-index block; call after the data blocks.
    pub fn add_file_index(&mut self, index: &FileIndex) -> &mut Self {
        self.add_block(&index.encode())
    }

    pub fn build(&self) -> Vec<u8> {
        let flags = StreamFlags { check: self.check };
        let mut out = StreamHeaderParser::encode(flags).to_vec();
        out.extend_from_slice(&self.body);
        let index = IndexParser::encode(&self.records);
        out.extend_from_slice(&index);
        out.extend_from_slice(&StreamFooterParser::encode(index.len() as u64, flags));
        out
    }
}

fn lzma2_compressed_len(block: &[u8]) -> usize {
    let header = BlockHeaderParser::parse(block).unwrap();
    header.compressed_size.unwrap() as usize
}

/// A tarball and the pixz file index describing it.
pub struct TarFixture {
    pub tar: Vec<u8>,
    pub index: FileIndex,
}

/// Build a tar of regular files (names ending in `/` become directories),
/// recording where each member's header starts.
pub fn tar_fixture<D: AsRef<[u8]>>(files: &[(&str, D)]) -> TarFixture {
    let mut builder = tar::Builder::new(Vec::new());
    let mut entries = Vec::with_capacity(files.len());

    for (name, data) in files {
        let data = data.as_ref();
        entries.push(FileIndexEntry {
            name: name.to_string(),
            offset: builder.get_ref().len() as u64,
        });
        let mut header = tar::Header::new_gnu();
        if name.ends_with('/') {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
        } else {
            header.set_mode(0o644);
        }
        header.set_size(data.len() as u64);
        header.set_mtime(1_700_000_000);
        builder.append_data(&mut header, name, data).unwrap();
    }

    let end = builder.get_ref().len() as u64;
    let tar = builder.into_inner().unwrap();
    TarFixture {
        tar,
        index: FileIndex::new(entries, end).unwrap(),
    }
}

impl TarFixture {
    /// Compress the tar in `block_size` pieces and append the file index.
    pub fn to_container(&self, block_size: usize, check: Check) -> Vec<u8> {
        let mut builder = ContainerBuilder::new(check);
        for piece in self.tar.chunks(block_size) {
            builder.add_block(piece);
        }
        builder.add_file_index(&self.index);
        builder.build()
    }

    /// Bytes of the members whose names are listed, in archive order.
    pub fn member_bytes(&self, names: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for (entry, start, end) in self.index.iter_ranges() {
            if names.contains(&entry.name.as_str()) {
                out.extend_from_slice(&self.tar[start as usize..end as usize]);
            }
        }
        out
    }
}
