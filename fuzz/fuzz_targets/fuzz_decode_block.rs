#![no_main]
use libfuzzer_sys::fuzz_target;
use pread_xz::{BlockDecoder, Check, XzBlockDecoder};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // First byte picks the check, second the output size in KiB.
    let check = match data[0] % 4 {
        0 => Check::None,
        1 => Check::Crc32,
        2 => Check::Crc64,
        _ => Check::Sha256,
    };
    let mut output = vec![0u8; (data[1] as usize + 1) * 1024];
    let _ = XzBlockDecoder::new(check).decode_block(&data[2..], &mut output);
});
