//! Variable-length integer (VLI) parsing for the xz container.
//!
//! Each byte contributes 7 bits of data, least significant group first,
//! and the high bit says whether more bytes follow.
//!
//! Format:
//! - Bits 0-6: Data bits
//! - Bit 7: Continuation flag (1 = more bytes follow)
//!
//! xz caps a VLI at 9 bytes (63 bits) and rejects non-minimal encodings,
//! i.e. a trailing `0x00` group after the first byte.

/// Longest legal encoding.
pub const VLI_MAX_BYTES: usize = 9;

/// Read a variable-length integer from a byte slice.
/// Returns the value and the number of bytes consumed.
#[inline]
pub fn read_vli(data: &[u8]) -> Option<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= VLI_MAX_BYTES {
            return None;
        }

        result |= u64::from(byte & 0x7F) << shift;

        if byte & 0x80 == 0 {
            if i > 0 && byte == 0 {
                return None;
            }
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None
}

/// Encode a VLI. Used to build containers in tests and benches.
pub fn encode_vli(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Cursor for reading VLIs and fixed fields from a header buffer.
pub struct VliReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> VliReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Read the next VLI from the buffer.
    #[inline]
    pub fn read(&mut self) -> Option<u64> {
        let (value, consumed) = read_vli(&self.data[self.offset..])?;
        self.offset += consumed;
        Some(value)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.offset)?;
        self.offset += 1;
        Some(byte)
    }

    /// Read a fixed number of bytes.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(count)?;
        let slice = self.data.get(self.offset..end)?;
        self.offset = end;
        Some(slice)
    }

    /// Current position in the buffer.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Remaining bytes in the buffer.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_vli() {
        assert_eq!(read_vli(&[0x00]), Some((0, 1)));
        assert_eq!(read_vli(&[0x7F]), Some((127, 1)));
        assert_eq!(read_vli(&[0x01, 0xAA]), Some((1, 1)));
    }

    #[test]
    fn test_multi_byte_vli() {
        assert_eq!(read_vli(&[0x80, 0x01]), Some((128, 2)));
        assert_eq!(read_vli(&[0xFF, 0x01]), Some((255, 2)));
        assert_eq!(read_vli(&[0x80, 0x80, 0x01]), Some((16384, 3)));
    }

    #[test]
    fn test_non_minimal_rejected() {
        assert_eq!(read_vli(&[0x81, 0x00]), None);
    }

    #[test]
    fn test_too_long_rejected() {
        let data = [0xFF; 10];
        assert_eq!(read_vli(&data), None);
        let mut max = vec![0xFF; 8];
        max.push(0x7F);
        assert_eq!(read_vli(&max), Some((u64::MAX >> 1, 9)));
    }

    #[test]
    fn test_incomplete_vli() {
        assert_eq!(read_vli(&[]), None);
        assert_eq!(read_vli(&[0x80]), None);
    }

    #[test]
    fn test_encode_matches_decode() {
        for value in [0u64, 1, 127, 128, 300, 1 << 20, u64::MAX >> 1] {
            let mut buf = Vec::new();
            encode_vli(value, &mut buf);
            assert_eq!(read_vli(&buf), Some((value, buf.len())), "value {value}");
        }
    }

    #[test]
    fn test_vli_reader() {
        let data = [0x05, 0x80, 0x01, 0xAB, 0x7F];
        let mut reader = VliReader::new(&data);

        assert_eq!(reader.read(), Some(5));
        assert_eq!(reader.read(), Some(128));
        assert_eq!(reader.read_u8(), Some(0xAB));
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_bytes(2), None);
        assert_eq!(reader.read(), Some(127));
        assert!(reader.remaining().is_empty());
    }
}
