#![no_main]

use std::io::{Cursor, Read};

use libfuzzer_sys::fuzz_target;
use metascrub::{JpegSegments, PngSegments, SegmentSource};

/// Whatever the input, the segments handed out must be a prefix of it.
fn check_prefix<S: SegmentSource>(mut source: S, data: &[u8]) {
    let mut seen = Vec::new();
    while let Ok(Some(_)) = source.next_segment() {
        if source.segment_reader().read_to_end(&mut seen).is_err() {
            break;
        }
    }
    assert!(data.starts_with(&seen));
}

fuzz_target!(|data: &[u8]| {
    check_prefix(JpegSegments::new(Cursor::new(data)), data);
    check_prefix(PngSegments::new(Cursor::new(data)), data);
});
