//! Reusable block buffers.

use crate::error::Result;
use crate::file_media::zeroed_buffer;
use crossbeam_channel::{bounded, select, Receiver, Sender};

/// One compressed block in flight, with room for its decoded form.
///
/// Buffers are sized once for the largest block in the stream and reused
/// for every block after that.
#[derive(Debug)]
pub struct IoBlock {
    pub(crate) input: Vec<u8>,
    pub(crate) output: Vec<u8>,
    /// Compressed bytes held in `input`.
    pub(crate) input_len: usize,
    /// Bytes the decoder produced.
    pub(crate) output_len: usize,
    /// Bytes the block index promised.
    pub(crate) expected_len: usize,
    pub(crate) uncompressed_offset: u64,
    /// Block number from the index, for diagnostics.
    pub(crate) number: u64,
    /// Position in read order; merge restores this order.
    pub(crate) seq: u64,
}

impl IoBlock {
    pub fn new(max_input: usize, max_output: usize) -> Result<Self> {
        Ok(Self {
            input: zeroed_buffer(max_input as u64)?,
            output: zeroed_buffer(max_output as u64)?,
            input_len: 0,
            output_len: 0,
            expected_len: 0,
            uncompressed_offset: 0,
            number: 0,
            seq: 0,
        })
    }

    pub fn decoded(&self) -> &[u8] {
        &self.output[..self.output_len]
    }

    pub fn uncompressed_offset(&self) -> u64 {
        self.uncompressed_offset
    }

    pub fn uncompressed_end(&self) -> u64 {
        self.uncompressed_offset + self.output_len as u64
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Fixed set of [`IoBlock`]s on a bounded free queue.
///
/// Acquiring from an empty pool blocks until a consumer releases a
/// block; this is the pipeline's only back-pressure.
#[derive(Debug, Clone)]
pub struct BufferPool {
    free_tx: Sender<IoBlock>,
    free_rx: Receiver<IoBlock>,
    capacity: usize,
}

impl BufferPool {
    pub fn new(capacity: usize, max_input: usize, max_output: usize) -> Result<Self> {
        let (free_tx, free_rx) = bounded(capacity);
        for _ in 0..capacity {
            // Cannot fail: the queue holds exactly `capacity` blocks.
            let _ = free_tx.try_send(IoBlock::new(max_input, max_output)?);
        }
        Ok(Self {
            free_tx,
            free_rx,
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocks currently free.
    pub fn available(&self) -> usize {
        self.free_rx.len()
    }

    /// Wait for a free block, giving up once `shutdown` disconnects.
    pub fn acquire_until(&self, shutdown: &Receiver<()>) -> Option<IoBlock> {
        select! {
            recv(self.free_rx) -> block => block.ok(),
            recv(shutdown) -> _ => None,
        }
    }

    /// Return a block to the free queue. Never blocks.
    pub fn release(&self, mut block: IoBlock) {
        block.input_len = 0;
        block.output_len = 0;
        block.expected_len = 0;
        let _ = self.free_tx.try_send(block);
    }
}
