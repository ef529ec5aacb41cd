#![no_main]
use libfuzzer_sys::fuzz_target;
use pread_xz::parsing::IndexParser;
use pread_xz::FileIndex;

fuzz_target!(|data: &[u8]| {
    let _ = IndexParser::parse(data);
    if let Ok(Some(index)) = FileIndex::parse(data) {
        // Every entry range must be well formed.
        for (_, start, end) in index.iter_ranges() {
            assert!(start <= end);
        }
    }
});
