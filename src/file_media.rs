//! Byte sources for container reading.

use crate::error::{ExtractError, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Half-open byte range `[start, end)` in the compressed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadInterval {
    pub start: u64,
    pub end: u64,
}

impl ReadInterval {
    pub fn new(start: u64, len: u64) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Local archive file.
#[derive(Debug, Clone)]
pub struct LocalFileMedia {
    path: PathBuf,
    name: String,
    length: u64,
}

impl LocalFileMedia {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            length: metadata.len(),
        })
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}

/// Read `buf.len()` bytes unless the source ends first; returns the count read.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Allocate a zero-filled buffer whose size came from the archive.
///
/// Sizes the allocator cannot satisfy become [`ExtractError::InvalidHeader`]
/// instead of aborting the process.
pub fn zeroed_buffer(len: u64) -> Result<Vec<u8>> {
    let len = usize::try_from(len).map_err(|_| ExtractError::InvalidHeader("block size"))?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| ExtractError::InvalidHeader("block size"))?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Read exactly `interval` from a seekable source.
///
/// A source that ends early yields [`ExtractError::ShortRead`].
pub fn read_interval<R: Read + Seek + ?Sized>(
    reader: &mut R,
    interval: ReadInterval,
) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(interval.start))?;
    let mut buffer = zeroed_buffer(interval.len())?;
    let read = read_full(reader, &mut buffer)?;
    if read != buffer.len() {
        return Err(ExtractError::ShortRead {
            offset: interval.start,
            expected: interval.len(),
            actual: read as u64,
        });
    }
    Ok(buffer)
}
