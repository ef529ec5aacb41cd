//! Archive adapter: ordered blocks in, trimmed byte chunks out.
//!
//! The tar parser pulls bytes one chunk at a time. Each chunk is a span of
//! the current decoded block, clipped to the current wanted range, so the
//! parser sees exactly the selected members back to back. A chunk is
//! copied to the output sink on the call *after* it was handed out, once
//! the parser is done with it.

use crate::error::{ExtractError, Result};
use crate::pipeline::{BlockStream, IoBlock};
use crate::want::WantCursor;
use std::io::{self, Read, Write};

/// The span returned by the previous `next_chunk`, still to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFlush {
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advance {
    /// The current block still holds wanted bytes.
    Stay,
    Moved,
    End,
}

pub struct ArchiveAdapter<S> {
    stream: S,
    wants: WantCursor,
    current: Option<IoBlock>,
    /// The block before `current`, recycled on the next move.
    held: Option<IoBlock>,
    pending: Option<PendingFlush>,
    /// Set when the current range runs past the current block.
    force_advance: bool,
    flushed: u64,
}

impl<S: BlockStream> ArchiveAdapter<S> {
    pub fn new(stream: S, wants: WantCursor) -> Self {
        Self {
            stream,
            wants,
            current: None,
            held: None,
            pending: None,
            force_advance: false,
            flushed: 0,
        }
    }

    /// Bytes written to the sink so far.
    pub fn flushed(&self) -> u64 {
        self.flushed
    }

    /// The chunk most recently returned, until the next call flushes it.
    pub fn pending_chunk(&self) -> &[u8] {
        match (&self.current, self.pending) {
            (Some(block), Some(span)) => &block.decoded()[span.offset..span.offset + span.len],
            _ => &[],
        }
    }

    /// Flush the previous chunk to `sink` and return the next one.
    ///
    /// Returns `Ok(None)` at the end of the selection. Chunks are never
    /// empty.
    pub fn next_chunk(&mut self, sink: &mut dyn Write) -> Result<Option<&[u8]>> {
        self.flush_pending(sink)?;

        let (offset, len) = loop {
            if self.wants.is_filtering() && self.wants.current().is_none() {
                return Ok(None);
            }
            if self.advance_block()? == Advance::End {
                return Ok(None);
            }
            let Some(block) = self.current.as_ref() else {
                return Ok(None);
            };
            let block_start = block.uncompressed_offset();
            let block_end = block.uncompressed_end();

            if !self.wants.is_filtering() {
                if block_end == block_start {
                    continue;
                }
                break (0, block.decoded().len());
            }

            let Some(range) = self.wants.current() else {
                return Ok(None);
            };
            if range.start >= block_end {
                self.force_advance = true;
                continue;
            }
            if range.end <= block_start {
                return Err(ExtractError::InvalidHeader("file index (range outside stream)"));
            }

            let start = range.start.max(block_start);
            let end = if range.end > block_end {
                self.force_advance = true;
                block_end
            } else {
                let end = range.end;
                self.wants.advance();
                end
            };
            break ((start - block_start) as usize, (end - start) as usize);
        };

        self.pending = Some(PendingFlush { offset, len });
        Ok(Some(self.pending_chunk()))
    }

    fn advance_block(&mut self) -> Result<Advance> {
        if let Some(block) = &self.current {
            if self.wants.is_filtering() && !self.force_advance {
                if let Some(range) = self.wants.current() {
                    if range.start < block.uncompressed_end() {
                        return Ok(Advance::Stay);
                    }
                }
            }
        }

        if let Some(old) = self.held.take() {
            self.stream.recycle(old);
        }
        self.held = self.current.take();
        self.force_advance = false;
        match self.stream.next_block()? {
            Some(block) => {
                self.current = Some(block);
                Ok(Advance::Moved)
            }
            None => Ok(Advance::End),
        }
    }

    fn flush_pending(&mut self, sink: &mut dyn Write) -> Result<()> {
        let Some(span) = self.pending.take() else {
            return Ok(());
        };
        if let Some(block) = &self.current {
            sink.write_all(&block.decoded()[span.offset..span.offset + span.len])?;
            self.flushed += span.len as u64;
        }
        Ok(())
    }

    /// Recycle held blocks and give back the stream.
    pub fn into_inner(mut self) -> S {
        for block in [self.held.take(), self.current.take()].into_iter().flatten() {
            self.stream.recycle(block);
        }
        self.stream
    }
}

/// [`Read`] over an [`ArchiveAdapter`], for parsers that pull bytes.
///
/// Errors from the pipeline reach the parser as `io::Error`; the underlying
/// [`ExtractError`] is kept and returned by [`take_error`](Self::take_error)
/// and [`finish`](Self::finish).
pub struct ChunkReader<'w, S> {
    adapter: ArchiveAdapter<S>,
    sink: &'w mut dyn Write,
    pos: usize,
    len: usize,
    done: bool,
    error: Option<ExtractError>,
}

impl<'w, S: BlockStream> ChunkReader<'w, S> {
    pub fn new(adapter: ArchiveAdapter<S>, sink: &'w mut dyn Write) -> Self {
        Self {
            adapter,
            sink,
            pos: 0,
            len: 0,
            done: false,
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<ExtractError> {
        self.error.take()
    }

    /// Write out the rest of the selection, whether or not the parser read
    /// it, and return the adapter.
    pub fn finish(mut self) -> Result<ArchiveAdapter<S>> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if !self.done {
            while self.adapter.next_chunk(self.sink)?.is_some() {}
            self.done = true;
        }
        Ok(self.adapter)
    }
}

impl<S: BlockStream> Read for ChunkReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.done || buf.is_empty() {
                return Ok(0);
            }
            if self.pos < self.len {
                let chunk = &self.adapter.pending_chunk()[self.pos..self.len];
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                self.pos += n;
                return Ok(n);
            }
            match self.adapter.next_chunk(self.sink) {
                Ok(Some(chunk)) => {
                    self.len = chunk.len();
                    self.pos = 0;
                }
                Ok(None) => self.done = true,
                Err(e) => {
                    let err = io::Error::other(e.to_string());
                    self.error = Some(e);
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_index::{FileIndex, FileIndexEntry};
    use crate::want::WantList;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Blocks from memory; counts recycled blocks.
    struct VecStream {
        blocks: VecDeque<IoBlock>,
        recycled: usize,
    }

    impl VecStream {
        /// Split `data` at `cuts` into blocks.
        fn new(data: &[u8], cuts: &[usize]) -> Self {
            let mut bounds = vec![0];
            bounds.extend_from_slice(cuts);
            bounds.push(data.len());
            let blocks = bounds
                .windows(2)
                .enumerate()
                .map(|(i, w)| {
                    let piece = &data[w[0]..w[1]];
                    let mut block = IoBlock::new(0, piece.len()).unwrap();
                    block.output.copy_from_slice(piece);
                    block.output_len = piece.len();
                    block.uncompressed_offset = w[0] as u64;
                    block.seq = i as u64;
                    block
                })
                .collect();
            Self {
                blocks,
                recycled: 0,
            }
        }
    }

    impl BlockStream for VecStream {
        fn next_block(&mut self) -> Result<Option<IoBlock>> {
            Ok(self.blocks.pop_front())
        }

        fn recycle(&mut self, _block: IoBlock) {
            self.recycled += 1;
        }
    }

    fn wants(entries: &[(&str, u64)], end: u64, specs: &[&str]) -> WantCursor {
        let index = FileIndex::new(
            entries
                .iter()
                .map(|&(name, offset)| FileIndexEntry {
                    name: name.into(),
                    offset,
                })
                .collect(),
            end,
        )
        .unwrap();
        Arc::new(WantList::resolve(specs, Some(&index)).unwrap()).cursor()
    }

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    fn drain<S: BlockStream>(adapter: &mut ArchiveAdapter<S>, sink: &mut Vec<u8>) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = adapter.next_chunk(sink).unwrap() {
            chunks.push(chunk.to_vec());
        }
        chunks
    }

    #[test]
    fn test_range_spanning_blocks() {
        let data = data(30);
        let stream = VecStream::new(&data, &[20]);
        let cursor = wants(&[("a", 0), ("b", 10), ("c", 25)], 30, &["b"]);
        let mut adapter = ArchiveAdapter::new(stream, cursor);
        let mut sink = Vec::new();

        let first = adapter.next_chunk(&mut sink).unwrap().unwrap().to_vec();
        assert_eq!(first, &data[10..20]);
        assert!(adapter.force_advance);
        assert!(sink.is_empty());

        let second = adapter.next_chunk(&mut sink).unwrap().unwrap().to_vec();
        assert_eq!(second, &data[20..25]);
        assert_eq!(sink, &data[10..20]);
        assert!(adapter.wants.current().is_none());

        assert!(adapter.next_chunk(&mut sink).unwrap().is_none());
        assert_eq!(sink, &data[10..25]);
        assert_eq!(adapter.flushed(), 15);
    }

    #[test]
    fn test_several_ranges_in_one_block() {
        let data = data(40);
        let stream = VecStream::new(&data, &[]);
        let cursor = wants(&[("a", 0), ("b", 10), ("c", 25), ("d", 30)], 40, &["a", "c"]);
        let mut adapter = ArchiveAdapter::new(stream, cursor);
        let mut sink = Vec::new();

        let chunks = drain(&mut adapter, &mut sink);
        assert_eq!(chunks, [data[0..10].to_vec(), data[25..30].to_vec()]);
        assert_eq!(sink, [&data[0..10], &data[25..30]].concat());
    }

    #[test]
    fn test_blocks_before_range_passed_over() {
        let data = data(50);
        let stream = VecStream::new(&data, &[10, 20, 30, 40]);
        let cursor = wants(&[("a", 0), ("b", 35)], 50, &["b"]);
        let mut adapter = ArchiveAdapter::new(stream, cursor);
        let mut sink = Vec::new();

        drain(&mut adapter, &mut sink);
        assert_eq!(sink, &data[35..50]);
    }

    #[test]
    fn test_missing_range_data_is_an_error() {
        let data = data(30);
        let mut stream = VecStream::new(&data, &[20]);
        stream.blocks.pop_front();
        let cursor = wants(&[("a", 0), ("b", 10)], 30, &["a"]);
        let mut adapter = ArchiveAdapter::new(stream, cursor);
        let mut sink = Vec::new();

        let err = adapter.next_chunk(&mut sink).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::InvalidHeader("file index (range outside stream)")
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unfiltered_returns_whole_blocks() {
        let data = data(30);
        let stream = VecStream::new(&data, &[12, 12, 20]);
        let cursor = wants(&[("a", 0), ("b", 10)], 30, &[]);
        let mut adapter = ArchiveAdapter::new(stream, cursor);
        let mut sink = Vec::new();

        let chunks = drain(&mut adapter, &mut sink);
        assert_eq!(chunks.len(), 3, "empty block skipped");
        assert_eq!(sink, data);
        let stream = adapter.into_inner();
        assert_eq!(stream.recycled, 4);
    }

    #[test]
    fn test_chunk_reader_finish_writes_rest() {
        let data = data(30);
        let stream = VecStream::new(&data, &[8, 16]);
        let cursor = wants(&[("a", 0), ("b", 10), ("c", 25)], 30, &["a", "b"]);
        let mut sink = Vec::new();
        let mut reader = ChunkReader::new(ArchiveAdapter::new(stream, cursor), &mut sink);

        let mut head = [0u8; 4];
        reader.read_exact(&mut head).unwrap();
        assert_eq!(head, [0, 1, 2, 3]);
        let adapter = reader.finish().unwrap();
        assert_eq!(adapter.flushed(), 25);
        assert_eq!(sink, &data[0..25]);
    }

    #[test]
    fn test_chunk_reader_reads_selection() {
        let data = data(30);
        let stream = VecStream::new(&data, &[7, 21]);
        let cursor = wants(&[("a", 0), ("b", 10), ("c", 25)], 30, &["b", "c"]);
        let mut sink = Vec::new();
        let mut reader = ChunkReader::new(ArchiveAdapter::new(stream, cursor), &mut sink);

        let mut read = Vec::new();
        reader.read_to_end(&mut read).unwrap();
        assert_eq!(read, &data[10..30]);
        reader.finish().unwrap();
        assert_eq!(sink, &data[10..30]);
    }
}
