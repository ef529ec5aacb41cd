//! Decoder stage: workers that each decode whole blocks.

use super::pool::IoBlock;
use crate::decompress::{BlockDecoder, DecodeError};
use crate::error::{ExtractError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use tracing::trace;

/// Decode blocks until the decode queue disconnects or the consumer is gone.
pub(crate) fn decode_worker(
    decoder: Arc<dyn BlockDecoder>,
    blocks: Receiver<IoBlock>,
    results: Sender<Result<IoBlock>>,
) {
    for mut block in blocks.iter() {
        let result = decode_one(decoder.as_ref(), &mut block).map(|()| block);
        if results.send(result).is_err() {
            return;
        }
    }
}

fn decode_one(decoder: &dyn BlockDecoder, block: &mut IoBlock) -> Result<()> {
    let expected = block.expected_len;
    let produced = decoder
        .decode_block(&block.input[..block.input_len], &mut block.output[..expected])
        .map_err(|e| ExtractError::decode(block.number, e))?;
    if produced != expected {
        return Err(ExtractError::decode(
            block.number,
            DecodeError::SizeMismatch {
                expected: expected as u64,
                actual: produced as u64,
            },
        ));
    }
    block.output_len = produced;
    trace!(block = block.number, bytes = produced, "decoded block");
    Ok(())
}
