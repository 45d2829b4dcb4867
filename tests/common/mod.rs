#![allow(dead_code)]

use std::io::{self, Read};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Hands out at most `chunk` bytes per read.
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedReader {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        assert!(chunk > 0);
        Self { data, pos: 0, chunk }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Returns `data`, then fails every read after it.
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
}

impl FailingReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.data.len() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "source went away"));
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Drains `reader` using a caller buffer of `buf_len` bytes.
pub fn read_all_with(reader: &mut impl Read, buf_len: usize) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; buf_len];
    loop {
        match reader.read(&mut buf)? {
            0 => return Ok(out),
            n => {
                assert!(n <= buf_len);
                out.extend_from_slice(&buf[..n]);
            }
        }
    }
}

pub fn make_png_chunk(chunk_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::new();
    chunk.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    chunk.extend_from_slice(chunk_type);
    chunk.extend_from_slice(payload);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(payload);
    chunk.extend_from_slice(&hasher.finalize().to_be_bytes());
    chunk
}

pub fn make_valid_ihdr(width: u32, height: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&width.to_be_bytes());
    payload.extend_from_slice(&height.to_be_bytes());
    payload.extend_from_slice(&[8, 2, 0, 0, 0]);
    make_png_chunk(b"IHDR", &payload)
}

pub fn png_from_chunks(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut png = PNG_SIGNATURE.to_vec();
    for chunk in chunks {
        png.extend_from_slice(chunk);
    }
    png
}

pub fn make_jpeg_segment(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut segment = vec![0xFF, code];
    segment.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
    segment.extend_from_slice(payload);
    segment
}

pub fn exif_app1() -> Vec<u8> {
    let mut payload = b"Exif\x00\x00".to_vec();
    payload.extend_from_slice(b"MM\x00\x2A\x00\x00\x00\x08");
    payload.extend_from_slice(b"SECRET-CAMERA-SERIAL");
    make_jpeg_segment(0xE1, &payload)
}

pub fn dqt() -> Vec<u8> {
    let mut payload = vec![0x00];
    payload.extend(std::iter::repeat_n(10u8, 64));
    make_jpeg_segment(0xDB, &payload)
}

pub fn sof0() -> Vec<u8> {
    make_jpeg_segment(0xC0, &[0x08, 0x00, 0x10, 0x00, 0x10, 0x01, 0x01, 0x11, 0x00])
}

pub fn sos_header() -> Vec<u8> {
    make_jpeg_segment(0xDA, &[0x01, 0x01, 0x00, 0x00, 0x3F, 0x00])
}

/// Entropy-coded bytes: every `0xFF` is stuffed or starts a restart marker.
pub fn scan_data(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let mut data = Vec::with_capacity(len + len / 64);
    let mut restart = 0u8;
    while data.len() < len {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let byte = (state >> 16) as u8;
        data.push(byte);
        if byte == 0xFF {
            if state & 0x100 == 0 {
                data.push(0x00);
            } else {
                data.push(0xD0 + restart);
                restart = (restart + 1) % 8;
            }
        }
    }
    data
}

/// SOI, `extra` segments, DQT, SOF0, SOS, scan data, EOI.
pub fn make_jpeg(extra: &[Vec<u8>], scan: &[u8]) -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8];
    for segment in extra {
        jpeg.extend_from_slice(segment);
    }
    jpeg.extend_from_slice(&dqt());
    jpeg.extend_from_slice(&sof0());
    jpeg.extend_from_slice(&sos_header());
    jpeg.extend_from_slice(scan);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Small RGB test picture with enough detail that its encodings exceed the sniff window.
pub fn test_picture() -> image::RgbImage {
    let mut state = 0x1234_5678u32;
    image::RgbImage::from_fn(64, 48, |x, y| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let noise = (state >> 24) as u8;
        image::Rgb([
            (x * 4) as u8 ^ noise,
            (y * 5) as u8,
            ((x + y) * 2) as u8 ^ (noise >> 1),
        ])
    })
}

pub fn encode_png(img: &image::RgbImage) -> Vec<u8> {
    use image::ImageEncoder;

    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    out
}

pub fn encode_jpeg(img: &image::RgbImage) -> Vec<u8> {
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 90)
        .encode_image(img)
        .unwrap();
    out
}

/// Walks every segment, metadata included, collecting its bytes.
pub fn collect_segments<S: metascrub::SegmentSource>(
    source: &mut S,
) -> Vec<(metascrub::Segment, Vec<u8>)> {
    let mut segments = Vec::new();
    while let Some(segment) = source.next_segment().unwrap() {
        let mut bytes = Vec::new();
        source.segment_reader().read_to_end(&mut bytes).unwrap();
        segments.push((segment, bytes));
    }
    segments
}
