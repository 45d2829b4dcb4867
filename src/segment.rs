//! Segment abstraction shared by the container parsers.
//!
//! A [`SegmentSource`] walks a container front to back and hands out one
//! [`Segment`] at a time. The bytes of the current segment are read through the
//! source itself, so the underlying [`ByteSource`] keeps a single owner while
//! segments are consumed in order.

use std::io::{self, Read};

use crate::error::{Result, ScrubError};
use crate::formats::jpeg::Marker;
use crate::formats::png::ChunkType;
use crate::io::ByteSource;

const DISCARD_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Fixed container signature (the PNG magic).
    Signature,
    /// JPEG marker segment: SOI, EOI, RSTn, SOS header, or a length-prefixed segment.
    Marker(Marker),
    /// JPEG entropy-coded data following a start-of-scan header.
    ScanData,
    /// PNG chunk, header and CRC included.
    Chunk(ChunkType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    /// Offset of the first byte of the segment within the stream.
    pub offset: u64,
    /// Total length in bytes; `None` for scan data, whose end is only known once read.
    pub len: Option<u64>,
    pub is_metadata: bool,
}

impl Segment {
    pub fn bounded(kind: SegmentKind, offset: u64, len: u64, is_metadata: bool) -> Self {
        Self {
            kind,
            offset,
            len: Some(len),
            is_metadata,
        }
    }

    pub fn scan_data(offset: u64) -> Self {
        Self {
            kind: SegmentKind::ScanData,
            offset,
            len: None,
            is_metadata: false,
        }
    }
}

pub trait SegmentSource {
    /// Advances to the next segment.
    ///
    /// Whatever is left of the current segment is discarded first. Returns
    /// `Ok(None)` once the container is exhausted and on every call after that.
    fn next_segment(&mut self) -> Result<Option<Segment>>;

    /// Reads bytes of the current segment. `Ok(0)` for a non-empty `buf` means
    /// the segment is exhausted.
    fn read_segment(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Drains the rest of the current segment, returning how many bytes were skipped.
    fn discard_segment(&mut self) -> Result<u64> {
        let mut scratch = [0u8; DISCARD_CHUNK];
        let mut skipped = 0u64;
        loop {
            match self.read_segment(&mut scratch)? {
                0 => return Ok(skipped),
                n => skipped += n as u64,
            }
        }
    }

    /// `Read` view over the current segment.
    fn segment_reader(&mut self) -> SegmentReader<'_, Self> {
        SegmentReader { source: self }
    }
}

pub struct SegmentReader<'a, S: ?Sized> {
    source: &'a mut S,
}

impl<S: SegmentSource + ?Sized> Read for SegmentReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.source.read_segment(buf).map_err(io::Error::from)
    }
}

/// Length-limited view of the byte source for segments whose size is declared up front.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Bounded {
    remaining: u64,
}

impl Bounded {
    pub(crate) fn new(len: u64) -> Self {
        Self { remaining: len }
    }

    #[inline]
    pub(crate) fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    pub(crate) fn read<R: Read>(
        &mut self,
        source: &mut ByteSource<R>,
        buf: &mut [u8],
    ) -> Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let max = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = source.read_some(&mut buf[..max])?;
        if n == 0 {
            return Err(ScrubError::malformed(
                "segment body",
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("{} bytes missing", self.remaining),
                ),
            ));
        }

        self.remaining -= n as u64;
        Ok(n)
    }
}
