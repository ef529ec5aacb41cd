//! xz block decoder on top of liblzma's raw decoder.

use super::{BlockDecoder, Check, DecodeError, Result};
use crate::parsing::block_header::{
    BlockHeaderParser, FilterFlags, FILTER_ARM, FILTER_ARMTHUMB, FILTER_IA64, FILTER_LZMA2,
    FILTER_POWERPC, FILTER_SPARC, FILTER_X86,
};
use liblzma::stream::{Action, Filters, LzmaOptions, Status, Stream};

/// Decodes complete xz blocks.
///
/// Holds only the stream's check kind; each call builds a fresh liblzma
/// decoder scoped to the one block, so a single instance can be shared by
/// every worker.
#[derive(Debug, Clone, Copy)]
pub struct XzBlockDecoder {
    check: Check,
}

impl XzBlockDecoder {
    pub fn new(check: Check) -> Self {
        Self { check }
    }

    /// Translate the header's filter chain into liblzma filters.
    fn build_filters(filters: &[FilterFlags]) -> Result<Filters> {
        let (last, bcj) = filters
            .split_last()
            .ok_or(DecodeError::InvalidHeader("empty filter chain"))?;
        if last.id != FILTER_LZMA2 {
            return Err(DecodeError::UnknownFilter(last.id));
        }

        let mut chain = Filters::new();
        for filter in bcj {
            // A non-default start offset would need liblzma's BCJ options.
            if !filter.props.is_empty() {
                return Err(DecodeError::InvalidFilterProperties(filter.id));
            }
            match filter.id {
                FILTER_X86 => {
                    chain.x86();
                }
                FILTER_POWERPC => {
                    chain.powerpc();
                }
                FILTER_IA64 => {
                    chain.ia64();
                }
                FILTER_ARM => {
                    chain.arm();
                }
                FILTER_ARMTHUMB => {
                    chain.arm_thumb();
                }
                FILTER_SPARC => {
                    chain.sparc();
                }
                id => return Err(DecodeError::UnknownFilter(id)),
            }
        }

        let mut options = LzmaOptions::new_preset(0)?;
        options.dict_size(lzma2_dict_size(&last.props)?);
        chain.lzma2(&options);
        Ok(chain)
    }
}

/// Dictionary size from the single LZMA2 properties byte.
pub fn lzma2_dict_size(props: &[u8]) -> Result<u32> {
    let &[bits] = props else {
        return Err(DecodeError::InvalidFilterProperties(FILTER_LZMA2));
    };
    match bits {
        0..=39 => Ok((2 | (u32::from(bits) & 1)) << (bits / 2 + 11)),
        40 => Ok(u32::MAX),
        _ => Err(DecodeError::InvalidFilterProperties(FILTER_LZMA2)),
    }
}

impl BlockDecoder for XzBlockDecoder {
    fn decode_block(&self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        let header = BlockHeaderParser::parse(input)?;
        let filters = Self::build_filters(&header.filters)?;
        let payload = &input[header.header_size..];

        let mut stream = Stream::new_raw_decoder(&filters)?;
        loop {
            let consumed = stream.total_in() as usize;
            let produced = stream.total_out() as usize;
            let status = stream.process(
                &payload[consumed..],
                &mut output[produced..],
                Action::Finish,
            )?;
            if matches!(status, Status::StreamEnd) {
                break;
            }
            if stream.total_in() as usize == consumed && stream.total_out() as usize == produced
            {
                if produced == output.len() {
                    return Err(DecodeError::OutputOverflow {
                        capacity: output.len(),
                    });
                }
                return Err(DecodeError::UnexpectedEof);
            }
        }

        let compressed = stream.total_in();
        let produced = stream.total_out();
        if let Some(expected) = header.compressed_size {
            if expected != compressed {
                return Err(DecodeError::SizeMismatch {
                    expected,
                    actual: compressed,
                });
            }
        }
        if let Some(expected) = header.uncompressed_size {
            if expected != produced {
                return Err(DecodeError::SizeMismatch {
                    expected,
                    actual: produced,
                });
            }
        }

        let data_end = header.header_size + compressed as usize;
        let check_start = (data_end + 3) & !3;
        let padding = input
            .get(data_end..check_start)
            .ok_or(DecodeError::UnexpectedEof)?;
        if padding.iter().any(|&b| b != 0) {
            return Err(DecodeError::InvalidPadding);
        }

        let check_end = check_start + self.check.size();
        let stored = input
            .get(check_start..check_end)
            .ok_or(DecodeError::UnexpectedEof)?;
        let produced = produced as usize;
        if !self.check.verify(&output[..produced], stored) {
            return Err(DecodeError::CheckMismatch(self.check));
        }
        if check_end != input.len() {
            return Err(DecodeError::SizeMismatch {
                expected: input.len() as u64,
                actual: check_end as u64,
            });
        }

        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::encode_block;

    #[test]
    fn test_dict_size() {
        assert_eq!(lzma2_dict_size(&[0]).unwrap(), 4096);
        assert_eq!(lzma2_dict_size(&[1]).unwrap(), 6144);
        assert_eq!(lzma2_dict_size(&[16]).unwrap(), 1 << 20);
        assert_eq!(lzma2_dict_size(&[40]).unwrap(), u32::MAX);
        assert!(lzma2_dict_size(&[41]).is_err());
        assert!(lzma2_dict_size(&[]).is_err());
    }

    #[test]
    fn test_decode_block() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        for check in [Check::None, Check::Crc32, Check::Crc64, Check::Sha256] {
            let block = encode_block(&data, check);
            let mut output = vec![0u8; data.len()];
            let decoded = XzBlockDecoder::new(check)
                .decode_block(&block, &mut output)
                .unwrap();
            assert_eq!(decoded, data.len());
            assert_eq!(output, data, "{check:?}");
        }
    }

    #[test]
    fn test_check_mismatch() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let mut block = encode_block(&data, Check::Crc64);
        let last = block.len() - 1;
        block[last] ^= 0xFF;
        let mut output = vec![0u8; data.len()];
        assert!(matches!(
            XzBlockDecoder::new(Check::Crc64).decode_block(&block, &mut output),
            Err(DecodeError::CheckMismatch(Check::Crc64))
        ));
    }

    #[test]
    fn test_output_too_small() {
        let data = vec![7u8; 4096];
        let block = encode_block(&data, Check::Crc32);
        let mut output = vec![0u8; 1000];
        assert!(matches!(
            XzBlockDecoder::new(Check::Crc32).decode_block(&block, &mut output),
            Err(DecodeError::OutputOverflow { capacity: 1000 })
        ));
    }

    #[test]
    fn test_truncated_block() {
        let data: Vec<u8> = (0..3000u32).map(|i| (i * 7 % 256) as u8).collect();
        let block = encode_block(&data, Check::Crc32);
        let mut output = vec![0u8; data.len()];
        let result =
            XzBlockDecoder::new(Check::Crc32).decode_block(&block[..block.len() / 2], &mut output);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_filter() {
        let chain = [FilterFlags {
            id: 0x03,
            props: vec![0],
        }];
        assert!(matches!(
            XzBlockDecoder::build_filters(&chain),
            Err(DecodeError::UnknownFilter(0x03))
        ));
    }
}
