//! CRC32 and CRC64 as used by the xz container.
//!
//! Both are the reflected variants with all-ones init and final XOR:
//! CRC32 is the IEEE polynomial (headers, index, `Check::Crc32`), CRC64
//! is the ECMA-182 polynomial (`Check::Crc64`).

/// CRC32 lookup table (polynomial 0xEDB88320)
const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC64 lookup table (polynomial 0xC96C5795D7870F42)
const CRC64_TABLE: [u64; 256] = {
    let mut table = [0u64; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u64;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xC96C5795D7870F42;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// CRC32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFFFFFF_u32;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFFFFFF
}

/// CRC64 of `data`.
pub fn crc64(data: &[u8]) -> u64 {
    let mut crc = u64::MAX;
    for &byte in data {
        let index = ((crc ^ byte as u64) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC64_TABLE[index];
    }
    !crc
}

/// Compare a stored little-endian CRC32 against `data`.
pub fn crc32_matches(data: &[u8], stored: &[u8]) -> bool {
    stored.len() == 4 && crc32(data).to_le_bytes() == stored
}
