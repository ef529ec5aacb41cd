//! Reader stage: sequential block reads into pooled buffers.

use super::pool::{BufferPool, IoBlock};
use crate::container::BlockDescriptor;
use crate::error::{ExtractError, Result};
use crate::file_media::read_full;
use crate::want::WantCursor;
use crossbeam_channel::{Receiver, Sender};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

pub(crate) struct ReaderStage<R> {
    pub(crate) source: R,
    pub(crate) blocks: Vec<BlockDescriptor>,
    pub(crate) metadata_offset: Option<u64>,
    pub(crate) wants: WantCursor,
    pub(crate) pool: BufferPool,
    pub(crate) decode_tx: Sender<IoBlock>,
    pub(crate) shutdown: Receiver<()>,
}

impl<R: Read + Seek> ReaderStage<R> {
    /// Run to completion, handing failures to the consumer through `results`.
    pub(crate) fn run_reporting(self, results: Sender<Result<IoBlock>>) {
        if let Err(e) = self.run() {
            // Nobody to tell if the consumer is gone.
            let _ = results.send(Err(e));
        }
    }

    /// Read every wanted block in order. Returns when the index is
    /// exhausted or the downstream side has gone away; dropping the
    /// decode sender on return is what stops the workers.
    pub(crate) fn run(mut self) -> Result<()> {
        let mut position = None;
        let mut seq = 0u64;
        let blocks = std::mem::take(&mut self.blocks);

        for desc in &blocks {
            if Some(desc.compressed_offset) == self.metadata_offset {
                continue;
            }
            if !self.wanted(desc) {
                debug!(block = desc.number, "skipping block");
                continue;
            }

            let Some(mut block) = self.pool.acquire_until(&self.shutdown) else {
                return Ok(());
            };

            if position != Some(desc.compressed_offset) {
                self.source.seek(SeekFrom::Start(desc.compressed_offset))?;
            }
            let len = desc.total_size as usize;
            let read = read_full(&mut self.source, &mut block.input[..len])?;
            if read != len {
                return Err(ExtractError::ShortRead {
                    offset: desc.compressed_offset,
                    expected: desc.total_size,
                    actual: read as u64,
                });
            }
            position = Some(desc.compressed_offset + desc.total_size);

            block.input_len = len;
            block.expected_len = desc.uncompressed_size as usize;
            block.uncompressed_offset = desc.uncompressed_offset;
            block.number = desc.number;
            block.seq = seq;
            seq += 1;

            debug!(block = desc.number, seq = block.seq, "read block");
            if self.decode_tx.send(block).is_err() {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Does `desc` hold any byte of a wanted range?
    ///
    /// Moves the cursor past ranges that end inside this block, so the
    /// check stays monotonic over the index.
    fn wanted(&mut self, desc: &BlockDescriptor) -> bool {
        if !self.wants.is_filtering() {
            return true;
        }
        let end = desc.uncompressed_end();
        match self.wants.current() {
            None => false,
            Some(range) if range.start >= end => false,
            Some(_) => {
                self.wants.skip_ending_by(end);
                true
            }
        }
    }
}
