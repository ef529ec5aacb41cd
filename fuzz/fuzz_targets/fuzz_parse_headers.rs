#![no_main]
use libfuzzer_sys::fuzz_target;
use pread_xz::parsing::{BlockHeaderParser, StreamFooterParser, StreamHeaderParser};

fuzz_target!(|data: &[u8]| {
    let _ = StreamHeaderParser::parse(data);
    let _ = StreamFooterParser::parse(data);
    let _ = BlockHeaderParser::parse(data);
});
