//! Merge stage: restores read order after parallel decode.

use super::pool::IoBlock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub(crate) struct Reorder {
    next_seq: u64,
    pending: BTreeMap<u64, IoBlock>,
}

impl Reorder {
    pub(crate) fn push(&mut self, block: IoBlock) {
        self.pending.insert(block.seq, block);
    }

    /// The next block in read order, if it has arrived.
    pub(crate) fn pop_ready(&mut self) -> Option<IoBlock> {
        let block = self.pending.remove(&self.next_seq)?;
        self.next_seq += 1;
        Some(block)
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
