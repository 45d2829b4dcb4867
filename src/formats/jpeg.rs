use std::io::Read;
use std::ops::RangeInclusive;

use tracing::{debug, trace, warn};

use crate::error::{Result, ScrubError};
use crate::io::ByteSource;
use crate::segment::{Bounded, Segment, SegmentKind, SegmentSource};

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

const MARKER_PREFIX: u8 = 0xFF;
const STUFFED_ZERO: u8 = 0x00;
const RESTART_MARKERS: RangeInclusive<u8> = 0xD0..=0xD7;

/// APP0..=APP13. APP14 (Adobe) and APP15 can carry colour transform data a
/// decoder needs, so they are kept.
const METADATA_APP_MARKERS: RangeInclusive<u8> = 0xE0..=0xED;
const COMMENT_MARKER: u8 = 0xFE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    StartOfImage,
    EndOfImage,
    /// RSTn, holding n.
    Restart(u8),
    StartOfScan,
    /// Any other marker; always followed by a big-endian length that counts itself.
    Segment(u8),
}

impl Marker {
    pub fn from_code(code: u8) -> Self {
        match code {
            0xD8 => Marker::StartOfImage,
            0xD9 => Marker::EndOfImage,
            0xD0..=0xD7 => Marker::Restart(code - 0xD0),
            0xDA => Marker::StartOfScan,
            other => Marker::Segment(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Marker::StartOfImage => 0xD8,
            Marker::EndOfImage => 0xD9,
            Marker::Restart(n) => 0xD0 + n,
            Marker::StartOfScan => 0xDA,
            Marker::Segment(code) => code,
        }
    }

    #[inline]
    pub fn has_length(self) -> bool {
        matches!(self, Marker::StartOfScan | Marker::Segment(_))
    }

    #[inline]
    pub fn is_metadata(self) -> bool {
        match self {
            Marker::Segment(code) => {
                METADATA_APP_MARKERS.contains(&code) || code == COMMENT_MARKER
            }
            _ => false,
        }
    }
}

/// Whether `0xFF` followed by `next` ends entropy-coded data.
#[inline]
pub fn is_scan_terminator(next: u8) -> bool {
    next != STUFFED_ZERO && !RESTART_MARKERS.contains(&next)
}

/// Index of the first `0xFF` in `data` that starts a marker ending the scan.
///
/// Only pairs fully inside `data` are considered; a trailing lone `0xFF` is
/// left for the caller to resolve.
pub fn find_scan_terminator(data: &[u8]) -> Option<usize> {
    memchr::memchr_iter(MARKER_PREFIX, data)
        .find(|&i| i + 1 < data.len() && is_scan_terminator(data[i + 1]))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingHeader,
    BetweenSegments,
    /// The SOS header has been handed out; scan data comes next.
    InsideScan,
    Done,
    Failed,
}

/// Splits a JPEG stream into marker segments and scan data.
pub struct JpegSegments<R> {
    source: ByteSource<R>,
    state: State,
    body: Bounded,
    scan_open: bool,
}

impl<R: Read> JpegSegments<R> {
    pub fn new(reader: R) -> Self {
        Self::from_source(ByteSource::new(reader))
    }

    pub fn from_source(source: ByteSource<R>) -> Self {
        Self {
            source,
            state: State::AwaitingHeader,
            body: Bounded::default(),
            scan_open: false,
        }
    }

    pub fn into_source(self) -> ByteSource<R> {
        self.source
    }

    fn advance(&mut self) -> Result<Option<Segment>> {
        if self.scan_open || !self.body.is_exhausted() {
            self.discard_segment()?;
        }

        match self.state {
            State::AwaitingHeader => self.start_of_image(),
            State::BetweenSegments => self.marker_segment(),
            State::InsideScan => {
                let offset = self.source.position();
                trace!(offset, "jpeg scan data");
                self.state = State::BetweenSegments;
                self.scan_open = true;
                Ok(Some(Segment::scan_data(offset)))
            }
            State::Done => Ok(None),
            State::Failed => Err(ScrubError::Poisoned),
        }
    }

    fn start_of_image(&mut self) -> Result<Option<Segment>> {
        let offset = self.source.position();
        let Some(marker) = self.source.read_field::<2>("jpeg start-of-image marker")? else {
            self.state = State::Done;
            return Ok(None);
        };

        if marker != JPEG_SOI {
            return Err(ScrubError::inconsistent(
                "jpeg start-of-image marker",
                format!("found {:02X} {:02X}", marker[0], marker[1]),
            ));
        }

        self.source.unread(&marker);
        self.body = Bounded::new(2);
        self.state = State::BetweenSegments;
        Ok(Some(Segment::bounded(
            SegmentKind::Marker(Marker::StartOfImage),
            offset,
            2,
            false,
        )))
    }

    fn marker_segment(&mut self) -> Result<Option<Segment>> {
        let offset = self.source.position();
        let Some([prefix, code]) = self.source.read_field::<2>("jpeg segment marker")? else {
            debug!(offset, "jpeg stream ended between segments");
            self.state = State::Done;
            return Ok(None);
        };

        if prefix != MARKER_PREFIX {
            return Err(ScrubError::inconsistent(
                "jpeg segment marker",
                format!("expected 0xFF at offset {offset}, found {prefix:#04X}"),
            ));
        }

        let marker = Marker::from_code(code);
        let len = if marker.has_length() {
            let field = self.source.read_required::<2>("jpeg segment length")?;
            let declared = u16::from_be_bytes(field);
            if declared < 2 {
                return Err(ScrubError::inconsistent(
                    "jpeg segment length",
                    format!("marker {code:#04X} declares length {declared}"),
                ));
            }
            self.source.unread(&[prefix, code, field[0], field[1]]);
            2 + u64::from(declared)
        } else {
            self.source.unread(&[prefix, code]);
            2
        };

        self.state = match marker {
            Marker::EndOfImage => State::Done,
            Marker::StartOfScan => State::InsideScan,
            _ => State::BetweenSegments,
        };

        let is_metadata = marker.is_metadata();
        debug!(offset, marker = code, len, is_metadata, "jpeg segment");

        self.body = Bounded::new(len);
        Ok(Some(Segment::bounded(
            SegmentKind::Marker(marker),
            offset,
            len,
            is_metadata,
        )))
    }

    fn read_body(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if !self.scan_open {
            return self.body.read(&mut self.source, buf);
        }

        let n = self.read_scan(buf)?;
        if n == 0 {
            self.scan_open = false;
        }
        Ok(n)
    }

    /// Reads entropy-coded data without ever handing out the terminating marker.
    ///
    /// Bytes read past the boundary go back onto the source. A `0xFF` in the
    /// last position is only released once the byte after it is known.
    fn read_scan(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.source.read_some(buf)?;
        if n == 0 {
            trace!("jpeg scan data ran to end of stream");
            return Ok(0);
        }

        if let Some(end) = find_scan_terminator(&buf[..n]) {
            trace!(offset = self.source.position() - (n - end) as u64, "jpeg scan data ends");
            self.source.unread(&buf[end..n]);
            return Ok(end);
        }

        if buf[n - 1] != MARKER_PREFIX {
            return Ok(n);
        }

        match self.source.read_byte()? {
            Some(next) if is_scan_terminator(next) => {
                trace!("jpeg scan terminator split across reads");
                self.source.unread(&[MARKER_PREFIX, next]);
                Ok(n - 1)
            }
            Some(next) => {
                self.source.unread(&[next]);
                Ok(n)
            }
            None => Ok(n),
        }
    }

    fn poison_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if !matches!(e, ScrubError::Poisoned) {
                warn!(offset = self.source.position(), error = %e, "jpeg segment source failed");
            }
            self.state = State::Failed;
            self.body = Bounded::default();
            self.scan_open = false;
        }
        result
    }
}

impl<R: Read> SegmentSource for JpegSegments<R> {
    fn next_segment(&mut self) -> Result<Option<Segment>> {
        let result = self.advance();
        self.poison_on_error(result)
    }

    fn read_segment(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state == State::Failed {
            return Err(ScrubError::Poisoned);
        }
        let result = self.read_body(buf);
        self.poison_on_error(result)
    }
}
