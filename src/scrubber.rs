use std::io::{self, Read};

use tracing::debug;

use crate::filter::{FilteringStream, ScrubStats};
use crate::formats::{JpegSegments, PngSegments};
use crate::io::ByteSource;
use crate::sniff::{ContentType, SNIFF_LEN};

/// Metadata-free view of an arbitrary stream.
///
/// The stream type is decided once from the first [`SNIFF_LEN`] bytes. PNG and
/// JPEG streams are filtered; everything else, including any stream shorter
/// than the sniff window, is reproduced unchanged.
pub enum Scrubber<R> {
    Png(FilteringStream<PngSegments<R>>),
    Jpeg(FilteringStream<JpegSegments<R>>),
    Passthrough(ByteSource<R>),
}

impl<R: Read> Scrubber<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        let mut source = ByteSource::new(reader);
        let mut prefix = [0u8; SNIFF_LEN];
        let n = source.fill(&mut prefix)?;
        source.unread(&prefix[..n]);

        if n < SNIFF_LEN {
            debug!(len = n, "stream shorter than sniff window, passing through");
            return Ok(Scrubber::Passthrough(source));
        }

        let content_type = ContentType::detect(&prefix);
        debug!(mime = content_type.mime(), "sniffed stream");

        Ok(match content_type {
            ContentType::Png => Scrubber::Png(FilteringStream::new(PngSegments::from_source(source))),
            ContentType::Jpeg => {
                Scrubber::Jpeg(FilteringStream::new(JpegSegments::from_source(source)))
            }
            ContentType::Other => Scrubber::Passthrough(source),
        })
    }

    /// How the stream is being handled; short image streams report `Other`.
    pub fn content_type(&self) -> ContentType {
        match self {
            Scrubber::Png(_) => ContentType::Png,
            Scrubber::Jpeg(_) => ContentType::Jpeg,
            Scrubber::Passthrough(_) => ContentType::Other,
        }
    }

    pub fn stats(&self) -> Option<&ScrubStats> {
        match self {
            Scrubber::Png(stream) => Some(stream.stats()),
            Scrubber::Jpeg(stream) => Some(stream.stats()),
            Scrubber::Passthrough(_) => None,
        }
    }
}

impl<R: Read> Read for Scrubber<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Scrubber::Png(stream) => stream.read(buf),
            Scrubber::Jpeg(stream) => stream.read(buf),
            Scrubber::Passthrough(source) => source.read(buf),
        }
    }
}

/// Wraps `reader` in a [`Scrubber`]. Fails only if sniffing the prefix fails.
pub fn scrub<R: Read>(reader: R) -> io::Result<Scrubber<R>> {
    Scrubber::new(reader)
}
