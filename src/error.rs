//! Error types for container parsing and extraction.
//!
//! This module provides the [`ExtractError`] type which covers every way an
//! extraction run can fail. None of them are recovered locally: the first
//! error ends the run and is reported once by the caller.
//!
//! ## Error Categories
//!
//! | Category | Errors | Description |
//! |----------|--------|-------------|
//! | Usage | [`UnsupportedFilter`] | Path filters given for a stream without a file index |
//! | Lookup | [`NotFound`] | A path filter matched no archive member |
//! | I/O | [`Io`], [`ShortRead`] | Open, seek, read or write failures |
//! | Format | [`InvalidSignature`], [`InvalidHeader`], [`BufferTooSmall`], [`Decode`], [`Archive`] | Corrupt or unsupported container data |
//!
//! ## Example
//!
//! ```rust,ignore
//! use pread_xz::{ExtractError, ExtractOptions, Extractor};
//!
//! match extractor.run(&options, &mut out, |_| {}) {
//!     Ok(summary) => println!("{} bytes", summary.bytes_written),
//!     Err(ExtractError::NotFound(spec)) => eprintln!("{spec} is not in the archive"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```
//!
//! [`UnsupportedFilter`]: ExtractError::UnsupportedFilter
//! [`NotFound`]: ExtractError::NotFound
//! [`Io`]: ExtractError::Io
//! [`ShortRead`]: ExtractError::ShortRead
//! [`InvalidSignature`]: ExtractError::InvalidSignature
//! [`InvalidHeader`]: ExtractError::InvalidHeader
//! [`BufferTooSmall`]: ExtractError::BufferTooSmall
//! [`Decode`]: ExtractError::Decode
//! [`Archive`]: ExtractError::Archive

use crate::decompress::DecodeError;
use std::fmt;
use std::io;

/// Error type for extraction runs.
#[derive(Debug)]
pub enum ExtractError {
    /// Path filters were supplied but the stream carries no file index.
    ///
    /// Only archives written with an embedded file index (pixz `.tpxz`)
    /// can be filtered; a plain `.xz` can only be decoded whole.
    UnsupportedFilter,

    /// A path filter matched no member of the file index.
    ///
    /// Holds the filter as given, minus trailing `/`.
    NotFound(String),

    /// The stream does not start with the xz magic bytes.
    InvalidSignature,

    /// A stream header, footer, index or file index is malformed.
    InvalidHeader(&'static str),

    /// A buffer is smaller than the structure being parsed from it.
    BufferTooSmall {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        have: usize,
    },

    /// The input ended inside a compressed block.
    ShortRead {
        /// Compressed offset of the block.
        offset: u64,
        /// Bytes the block index promised.
        expected: u64,
        /// Bytes actually available.
        actual: u64,
    },

    /// A compressed block could not be decoded.
    Decode {
        /// Block number (1-based, as in the block index).
        block: u64,
        /// What went wrong inside the block.
        source: DecodeError,
    },

    /// The tar parser rejected the extracted byte stream.
    Archive(String),

    /// An I/O error occurred.
    Io(io::Error),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFilter => write!(f, "Can't filter non-tarball"),
            Self::NotFound(spec) => write!(f, "\"{}\" not found in archive", spec),
            Self::InvalidSignature => write!(f, "Not an xz stream"),
            Self::InvalidHeader(what) => write!(f, "Invalid or malformed {}", what),
            Self::BufferTooSmall { needed, have } => {
                write!(f, "Buffer too small: need {} bytes, have {}", needed, have)
            }
            Self::ShortRead {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "Error reading block contents at offset {}: expected {} bytes, got {}",
                offset, expected, actual
            ),
            Self::Decode { block, source } => write!(f, "Error decoding block {}: {}", block, source),
            Self::Archive(msg) => write!(f, "Error reading archive entry: {}", msg),
            Self::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for ExtractError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl ExtractError {
    /// Attach a block number to a decode failure.
    pub fn decode(block: u64, source: DecodeError) -> Self {
        Self::Decode { block, source }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
