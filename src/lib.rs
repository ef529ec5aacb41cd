//! Selective parallel extraction from indexed tar.xz archives.
//!
//! pixz writes tarballs as xz streams of independent blocks and appends a
//! file index mapping each member to its uncompressed byte range. This
//! crate uses that index to decode only the blocks a selection touches,
//! on several threads, and hands the trimmed byte stream to a tar parser.
//!
//! ## Flow
//!
//! 1. [`Container`] parses the stream header, footer, block index and file index.
//! 2. [`WantList`] turns path filters into wanted byte ranges.
//! 3. [`Pipeline`] reads, decodes and reorders blocks.
//! 4. [`ArchiveAdapter`] trims ordered blocks to the wanted ranges.
//! 5. [`Extractor`] drives one run and reports a summary.
//!
//! ```rust,ignore
//! use pread_xz::{ExtractOptions, Extractor};
//!
//! let extractor = Extractor::open("backup.tpxz")?;
//! let options = ExtractOptions {
//!     specs: vec!["etc/hosts".into()],
//!     ..ExtractOptions::default()
//! };
//! let mut out = std::io::stdout().lock();
//! extractor.run(&options, &mut out, |name| eprintln!("{name}"))?;
//! ```

mod crc;
pub mod adapter;
pub mod container;
pub mod decompress;
pub mod error;
pub mod extract;
pub mod file_index;
mod file_media;
pub mod parsing;
pub mod pipeline;
pub mod want;

#[cfg(test)]
mod test_support;

pub use adapter::{ArchiveAdapter, ChunkReader, PendingFlush};
pub use container::{BlockDescriptor, Container};
pub use decompress::{BlockDecoder, Check, DecodeError, XzBlockDecoder};
pub use error::{ExtractError, Result};
pub use extract::{ExtractOptions, ExtractSummary, Extractor};
pub use file_index::{FileIndex, FileIndexEntry};
pub use file_media::{LocalFileMedia, ReadInterval};
pub use pipeline::{BlockStream, BufferPool, IoBlock, Pipeline, PipelineOptions};
pub use want::{WantCursor, WantList, WantedRange};
