#![no_main]

use std::io::{Cursor, Read};

use libfuzzer_sys::fuzz_target;
use metascrub::scrub;

fuzz_target!(|data: &[u8]| {
    let Ok(mut scrubber) = scrub(Cursor::new(data)) else {
        return;
    };
    let mut out = Vec::new();
    if scrubber.read_to_end(&mut out).is_ok() {
        assert!(out.len() <= data.len());
    }
});
