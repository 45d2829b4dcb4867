use std::fmt;
use std::io::Read;

use tracing::{debug, warn};

use crate::error::{Result, ScrubError};
use crate::io::ByteSource;
use crate::segment::{Bounded, Segment, SegmentKind, SegmentSource};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Length field + type + CRC.
const CHUNK_OVERHEAD: u64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    pub const IDAT: ChunkType = ChunkType(*b"IDAT");
    pub const IEND: ChunkType = ChunkType(*b"IEND");
    pub const EXIF: ChunkType = ChunkType(*b"eXIf");
    pub const TEXT: ChunkType = ChunkType(*b"tEXt");
    pub const ITXT: ChunkType = ChunkType(*b"iTXt");
    pub const ZTXT: ChunkType = ChunkType(*b"zTXt");

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Critical chunks have an uppercase first letter.
    #[inline]
    pub fn is_critical(self) -> bool {
        self.0[0].is_ascii_uppercase()
    }

    /// Exact, case-sensitive match against the scrub set.
    #[inline]
    pub fn is_metadata(self) -> bool {
        METADATA_CHUNK_TYPES.contains(&self)
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

pub const METADATA_CHUNK_TYPES: [ChunkType; 4] = [
    ChunkType::EXIF,
    ChunkType::TEXT,
    ChunkType::ITXT,
    ChunkType::ZTXT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingSignature,
    BetweenChunks,
    Done,
    Failed,
}

/// Splits a PNG stream into its signature and chunks.
///
/// Parsing stops when the source runs dry, not at `IEND`: anything after the
/// last chunk is parsed as another chunk header.
pub struct PngSegments<R> {
    source: ByteSource<R>,
    state: State,
    body: Bounded,
}

impl<R: Read> PngSegments<R> {
    pub fn new(reader: R) -> Self {
        Self::from_source(ByteSource::new(reader))
    }

    pub fn from_source(source: ByteSource<R>) -> Self {
        Self {
            source,
            state: State::AwaitingSignature,
            body: Bounded::default(),
        }
    }

    pub fn into_source(self) -> ByteSource<R> {
        self.source
    }

    fn advance(&mut self) -> Result<Option<Segment>> {
        if !self.body.is_exhausted() {
            self.discard_segment()?;
        }

        match self.state {
            State::AwaitingSignature => self.signature(),
            State::BetweenChunks => self.chunk(),
            State::Done => Ok(None),
            State::Failed => Err(ScrubError::Poisoned),
        }
    }

    fn signature(&mut self) -> Result<Option<Segment>> {
        let offset = self.source.position();
        let Some(signature) = self.source.read_field::<8>("png signature")? else {
            self.state = State::Done;
            return Ok(None);
        };

        if signature != PNG_SIGNATURE {
            return Err(ScrubError::inconsistent(
                "png signature",
                format!("found {signature:02X?}"),
            ));
        }

        self.source.unread(&signature);
        self.body = Bounded::new(PNG_SIGNATURE.len() as u64);
        self.state = State::BetweenChunks;
        Ok(Some(Segment::bounded(
            SegmentKind::Signature,
            offset,
            PNG_SIGNATURE.len() as u64,
            false,
        )))
    }

    fn chunk(&mut self) -> Result<Option<Segment>> {
        let offset = self.source.position();
        let Some(length) = self.source.read_field::<4>("png chunk length")? else {
            debug!(offset, "png stream ended between chunks");
            self.state = State::Done;
            return Ok(None);
        };
        let chunk_type = ChunkType(self.source.read_required::<4>("png chunk type")?);

        let mut header = [0u8; 8];
        header[..4].copy_from_slice(&length);
        header[4..].copy_from_slice(chunk_type.as_bytes());
        self.source.unread(&header);

        let len = CHUNK_OVERHEAD + u64::from(u32::from_be_bytes(length));
        let is_metadata = chunk_type.is_metadata();
        debug!(
            offset,
            chunk = %chunk_type,
            critical = chunk_type.is_critical(),
            len,
            is_metadata,
            "png chunk"
        );

        self.body = Bounded::new(len);
        Ok(Some(Segment::bounded(
            SegmentKind::Chunk(chunk_type),
            offset,
            len,
            is_metadata,
        )))
    }

    fn poison_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if !matches!(e, ScrubError::Poisoned) {
                warn!(offset = self.source.position(), error = %e, "png segment source failed");
            }
            self.state = State::Failed;
            self.body = Bounded::default();
        }
        result
    }
}

impl<R: Read> SegmentSource for PngSegments<R> {
    fn next_segment(&mut self) -> Result<Option<Segment>> {
        let result = self.advance();
        self.poison_on_error(result)
    }

    fn read_segment(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state == State::Failed {
            return Err(ScrubError::Poisoned);
        }
        let result = self.body.read(&mut self.source, buf);
        self.poison_on_error(result)
    }
}
