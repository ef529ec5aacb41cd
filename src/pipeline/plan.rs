//! Buffer sizing from the block index.

use crate::container::BlockDescriptor;

/// Largest compressed and decoded block, which every pooled buffer must hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockSizes {
    pub max_input: usize,
    pub max_output: usize,
}

/// One pass over `blocks`, skipping the block at `metadata_offset`.
pub fn plan_block_sizes(blocks: &[BlockDescriptor], metadata_offset: Option<u64>) -> BlockSizes {
    blocks
        .iter()
        .filter(|block| Some(block.compressed_offset) != metadata_offset)
        .fold(BlockSizes::default(), |sizes, block| BlockSizes {
            max_input: sizes.max_input.max(block.total_size as usize),
            max_output: sizes.max_output.max(block.uncompressed_size as usize),
        })
}
