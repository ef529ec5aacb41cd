#![no_main]
use libfuzzer_sys::fuzz_target;
use pread_xz::{ExtractOptions, Extractor};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Skip inputs that claim absurd block sizes before allocating for them.
    let Ok(extractor) = Extractor::new(Cursor::new(data.to_vec())) else {
        return;
    };
    let too_big = extractor
        .container()
        .blocks()
        .iter()
        .any(|block| block.uncompressed_size > 1 << 24 || block.total_size > 1 << 24);
    if too_big {
        return;
    }
    let options = ExtractOptions {
        threads: 2,
        ..ExtractOptions::default()
    };
    let _ = extractor.run(&options, &mut std::io::sink(), |_| {});
});
