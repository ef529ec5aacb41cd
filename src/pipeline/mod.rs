//! Multi-stage block pipeline.
//!
//! ```text
//!            free queue (BufferPool, K blocks)
//!    ┌──────────────────────────────────────────────┐
//!    ↓                                              │
//! ┌────────┐  decode   ┌───────────┐  results  ┌───────┐  ordered  ┌──────────┐
//! │ Reader │ ────────→ │ Decoder×N │ ────────→ │ Merge │ ────────→ │ Consumer │
//! └────────┘   queue   └───────────┘   queue   └───────┘           └──────────┘
//! ```
//!
//! The reader runs on its own thread and the decoders on a dedicated
//! rayon pool; merge and the consumer run on the caller's thread through
//! [`BlockStream`]. A block belongs to exactly one stage at a time and
//! only moves by channel hand-off. When the reader runs out of blocks it
//! drops the decode queue, and every worker stops once it drains.
//!
//! There is no explicit cancellation: dropping a [`Pipeline`]
//! disconnects its channels, which unwinds the reader and the workers.

mod decoder;
mod merge;
mod plan;
mod pool;
mod reader;


pub use plan::{plan_block_sizes, BlockSizes};
pub use pool::{BufferPool, IoBlock};

use crate::container::Container;
use crate::decompress::BlockDecoder;
use crate::error::{ExtractError, Result};
use crate::want::WantCursor;
use crossbeam_channel::{bounded, Receiver, Sender};
use merge::Reorder;
use reader::ReaderStage;
use std::io::{self, Read, Seek};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Fewest blocks that keep the pipeline moving: the consumer can hold
/// two while the reader fills a third.
pub const MIN_POOL_BLOCKS: usize = 3;

/// Source of decoded blocks in stream order.
pub trait BlockStream {
    /// The next block, or `None` once the stream is exhausted.
    fn next_block(&mut self) -> Result<Option<IoBlock>>;

    /// Hand a consumed block back for reuse.
    fn recycle(&mut self, block: IoBlock);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Decoder workers.
    pub threads: usize,
    /// Pooled blocks; defaults to `2 * threads + 3`.
    pub pool_blocks: Option<usize>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism().map_or(1, |n| n.get()),
            pool_blocks: None,
        }
    }
}

impl PipelineOptions {
    pub fn pool_size(&self) -> usize {
        self.pool_blocks
            .unwrap_or(self.threads.max(1) * 2 + MIN_POOL_BLOCKS)
            .max(MIN_POOL_BLOCKS)
    }
}

/// A running reader/decoder/merge pipeline over one container.
pub struct Pipeline {
    // Dropped first: disconnecting it releases a reader waiting on the pool.
    _shutdown: Sender<()>,
    results: Receiver<Result<IoBlock>>,
    reorder: Reorder,
    pool: BufferPool,
    reader: Option<JoinHandle<()>>,
    _workers: rayon::ThreadPool,
}

impl Pipeline {
    /// Start the reader and decoder stages.
    ///
    /// `wants` decides which blocks the reader skips; the consumer keeps
    /// its own cursor over the same list.
    pub fn start<R>(
        source: R,
        container: &Container,
        wants: WantCursor,
        decoder: Arc<dyn BlockDecoder>,
        options: &PipelineOptions,
    ) -> Result<Self>
    where
        R: Read + Seek + Send + 'static,
    {
        let threads = options.threads.max(1);
        let capacity = options.pool_size();
        let sizes = plan_block_sizes(container.blocks(), container.file_index_offset());
        debug!(
            threads,
            blocks = capacity,
            max_input = sizes.max_input,
            max_output = sizes.max_output,
            "starting pipeline"
        );

        let pool = BufferPool::new(capacity, sizes.max_input, sizes.max_output)?;
        let (decode_tx, decode_rx) = bounded(capacity);
        // Room for every block plus one error from each stage.
        let (results_tx, results) = bounded(capacity + threads + 1);
        let (shutdown, shutdown_rx) = bounded(0);

        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("pread-decode-{i}"))
            .build()
            .map_err(|e| ExtractError::Io(io::Error::other(e.to_string())))?;
        for _ in 0..threads {
            let decoder = Arc::clone(&decoder);
            let blocks = decode_rx.clone();
            let results = results_tx.clone();
            workers.spawn(move || decoder::decode_worker(decoder, blocks, results));
        }

        let stage = ReaderStage {
            source,
            blocks: container.blocks().to_vec(),
            metadata_offset: container.file_index_offset(),
            wants,
            pool: pool.clone(),
            decode_tx,
            shutdown: shutdown_rx,
        };
        let reader = thread::Builder::new()
            .name("pread-reader".into())
            .spawn(move || stage.run_reporting(results_tx))?;

        Ok(Self {
            _shutdown: shutdown,
            results,
            reorder: Reorder::default(),
            pool,
            reader: Some(reader),
            _workers: workers,
        })
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Drain and recycle whatever is left, then join the reader.
    pub fn finish(mut self) -> Result<()> {
        while let Some(block) = self.next_block()? {
            self.recycle(block);
        }
        if let Some(reader) = self.reader.take() {
            reader
                .join()
                .map_err(|_| ExtractError::Io(io::Error::other("reader thread panicked")))?;
        }
        Ok(())
    }
}

impl BlockStream for Pipeline {
    fn next_block(&mut self) -> Result<Option<IoBlock>> {
        loop {
            if let Some(block) = self.reorder.pop_ready() {
                return Ok(Some(block));
            }
            match self.results.recv() {
                Ok(Ok(block)) => self.reorder.push(block),
                Ok(Err(e)) => return Err(e),
                Err(_) if self.reorder.is_empty() => return Ok(None),
                Err(_) => {
                    return Err(ExtractError::Io(io::Error::other(format!(
                        "decoders stopped before block {} in read order",
                        self.reorder.next_seq()
                    ))))
                }
            }
        }
    }

    fn recycle(&mut self, block: IoBlock) {
        self.pool.release(block);
    }
}

/// Write every decoded block whole, in order; returns the bytes written.
pub fn write_blocks<S, W>(stream: &mut S, out: &mut W) -> Result<u64>
where
    S: BlockStream + ?Sized,
    W: io::Write + ?Sized,
{
    let mut written = 0u64;
    while let Some(block) = stream.next_block()? {
        out.write_all(block.decoded())?;
        written += block.decoded().len() as u64;
        stream.recycle(block);
    }
    Ok(written)
}
