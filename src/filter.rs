use std::io::{self, Read};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, ScrubError};
use crate::segment::SegmentSource;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrubStats {
    pub segments_kept: u64,
    pub segments_removed: u64,
    pub bytes_kept: u64,
    pub bytes_removed: u64,
}

impl ScrubStats {
    pub fn segments_total(&self) -> u64 {
        self.segments_kept + self.segments_removed
    }
}

#[derive(Debug)]
enum FilterState {
    Draining,
    BetweenSegments,
    Finished,
    /// Holds an error that could not be returned together with bytes already copied.
    Failed(Option<ScrubError>),
}

/// `Read` over the non-metadata segments of a [`SegmentSource`], in order.
///
/// Metadata segments are drained internally and never reach the caller. A read
/// that fails after copying some bytes returns those bytes; the error comes
/// out of the following call.
pub struct FilteringStream<S> {
    source: S,
    state: FilterState,
    stats: ScrubStats,
}

impl<S: SegmentSource> FilteringStream<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: FilterState::BetweenSegments,
            stats: ScrubStats::default(),
        }
    }

    pub fn stats(&self) -> &ScrubStats {
        &self.stats
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, FilterState::Finished)
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn fill(&mut self, buf: &mut [u8], filled: &mut usize) -> Result<()> {
        while *filled < buf.len() {
            match self.state {
                FilterState::Finished => break,
                FilterState::Failed(_) => return Err(ScrubError::Poisoned),
                FilterState::Draining => match self.source.read_segment(&mut buf[*filled..])? {
                    0 => self.state = FilterState::BetweenSegments,
                    n => {
                        *filled += n;
                        self.stats.bytes_kept += n as u64;
                    }
                },
                FilterState::BetweenSegments => match self.source.next_segment()? {
                    None => {
                        debug!(stats = ?self.stats, "segment source exhausted");
                        self.state = FilterState::Finished;
                    }
                    Some(segment) if segment.is_metadata => {
                        let skipped = self.source.discard_segment()?;
                        debug!(offset = segment.offset, kind = ?segment.kind, skipped, "removed metadata segment");
                        self.stats.segments_removed += 1;
                        self.stats.bytes_removed += skipped;
                    }
                    Some(_) => {
                        self.stats.segments_kept += 1;
                        self.state = FilterState::Draining;
                    }
                },
            }
        }
        Ok(())
    }
}

impl<S: SegmentSource> Read for FilteringStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let FilterState::Failed(pending) = &mut self.state {
            return Err(pending.take().unwrap_or(ScrubError::Poisoned).into());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut filled = 0;
        match self.fill(buf, &mut filled) {
            Ok(()) => Ok(filled),
            Err(err) => {
                warn!(error = %err, filled, "scrubbing failed");
                if filled == 0 {
                    self.state = FilterState::Failed(None);
                    Err(err.into())
                } else {
                    self.state = FilterState::Failed(Some(err));
                    Ok(filled)
                }
            }
        }
    }
}
