//! Block decompression.
//!
//! Every block of an xz stream is self-contained: its header names the
//! filter chain, and no dictionary or state carries over from the
//! previous block. That is what lets the pipeline hand blocks to
//! independent workers.
//!
//! ## Decoders
//!
//! | Decoder | Format | Algorithms |
//! |---------|--------|------------|
//! | [`XzBlockDecoder`] | xz block | LZMA2, optionally behind BCJ filters (liblzma raw decoder) |
//!
//! ## Filter Support
//!
//! | Filter | ID | Supported |
//! |--------|----|-----------|
//! | LZMA2 | `0x21` | ✅ (must be last) |
//! | x86 / PowerPC / IA-64 / ARM / ARM-Thumb / SPARC | `0x04`-`0x09` | ✅ (no start offset) |
//! | Delta | `0x03` | ❌ |
//!
//! ## Architecture
//!
//! ```text
//! Block bytes (header | compressed | padding | check)
//!       ↓
//! ┌──────────────────┐
//! │ BlockHeaderParser│ ← size byte, flags, filter chain, CRC32
//! └──────────────────┘
//!       ↓
//! ┌──────────────────┐
//! │ liblzma raw      │ ← one decoder instance per block
//! └──────────────────┘
//!       ↓
//! ┌──────────────────┐
//! │ Check            │ ← padding, sizes, CRC32/CRC64/SHA-256
//! └──────────────────┘
//!       ↓
//! Decoded block
//! ```

mod check;
mod xz_block;

pub use check::Check;
pub use xz_block::XzBlockDecoder;

use std::fmt;

/// Block decode errors.
#[derive(Debug)]
pub enum DecodeError {
    /// Input ended before the block was complete.
    UnexpectedEof,
    /// The block header is malformed.
    InvalidHeader(&'static str),
    /// The filter chain names a filter this decoder does not handle.
    UnknownFilter(u64),
    /// Filter properties are malformed.
    InvalidFilterProperties(u64),
    /// Decoded data does not fit in the output buffer.
    OutputOverflow { capacity: usize },
    /// A recorded size disagrees with what was decoded.
    SizeMismatch { expected: u64, actual: u64 },
    /// Block padding contains non-zero bytes.
    InvalidPadding,
    /// The stored integrity check does not match the decoded data.
    CheckMismatch(Check),
    /// liblzma reported an error.
    Lzma(liblzma::stream::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "Unexpected end of data"),
            Self::InvalidHeader(what) => write!(f, "Invalid block header: {}", what),
            Self::UnknownFilter(id) => write!(f, "Unsupported filter: 0x{:02x}", id),
            Self::InvalidFilterProperties(id) => {
                write!(f, "Invalid properties for filter 0x{:02x}", id)
            }
            Self::OutputOverflow { capacity } => {
                write!(f, "Decoded data exceeds buffer of {} bytes", capacity)
            }
            Self::SizeMismatch { expected, actual } => {
                write!(f, "Size mismatch: expected {} bytes, got {}", expected, actual)
            }
            Self::InvalidPadding => write!(f, "Non-zero block padding"),
            Self::CheckMismatch(check) => write!(f, "{:?} integrity check failed", check),
            Self::Lzma(e) => write!(f, "LZMA error: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Lzma(e) => Some(e),
            _ => None,
        }
    }
}

impl From<liblzma::stream::Error> for DecodeError {
    fn from(e: liblzma::stream::Error) -> Self {
        Self::Lzma(e)
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Decodes one self-contained compressed block.
///
/// Implementations must not keep state between calls: the pipeline calls
/// the same decoder from several workers at once.
pub trait BlockDecoder: Send + Sync {
    /// Decode `input` (one whole block, header through check) into
    /// `output`, returning the number of bytes produced.
    fn decode_block(&self, input: &[u8], output: &mut [u8]) -> Result<usize>;
}
