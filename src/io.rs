use std::collections::VecDeque;
use std::io::{self, Read};

use crate::error::{Result, ScrubError};

/// Forward-only byte source with a replay buffer in front of the live reader.
///
/// Bytes that were read ahead (a sniffed prefix, a segment header, the tail of
/// a read that crossed a scan boundary) are handed back with [`unread`] and
/// come out again before anything new is pulled from the inner reader. The
/// inner reader itself is never seeked or modified.
///
/// [`unread`]: ByteSource::unread
pub struct ByteSource<R> {
    inner: R,
    replay: VecDeque<u8>,
    position: u64,
}

impl<R: Read> ByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            replay: VecDeque::new(),
            position: 0,
        }
    }

    /// Pushes `bytes` back so the next reads return them first, in order,
    /// ahead of any bytes already waiting for replay. Pending bytes are not moved.
    pub fn unread(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        self.replay.reserve(bytes.len());
        for &b in bytes.iter().rev() {
            self.replay.push_front(b);
        }
        self.position = self.position.saturating_sub(bytes.len() as u64);
    }

    /// Number of bytes currently waiting in the replay buffer.
    #[inline]
    pub fn replay_len(&self) -> usize {
        self.replay.len()
    }

    /// Offset of the next byte to be read, counted from the start of the stream.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Single read that retries on `Interrupted`; `Ok(0)` means EOF.
    pub fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    /// Reads until `buf` is full or the source reports EOF.
    pub fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Reads a fixed-size structural field.
    ///
    /// Returns `Ok(None)` on a clean EOF before the first byte of the field and
    /// `MalformedData` when the source ends part way through it.
    pub fn read_field<const N: usize>(&mut self, context: &'static str) -> Result<Option<[u8; N]>> {
        let mut field = [0u8; N];
        match self.fill(&mut field)? {
            0 => Ok(None),
            n if n == N => Ok(Some(field)),
            n => Err(ScrubError::malformed(
                context,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("expected {} bytes, got {}", N, n),
                ),
            )),
        }
    }

    /// Like [`read_field`](ByteSource::read_field), but EOF at any point is malformed.
    pub fn read_required<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        self.read_field(context)?.ok_or_else(|| {
            ScrubError::malformed(context, io::Error::from(io::ErrorKind::UnexpectedEof))
        })
    }

    /// Pulls a single byte, retrying interrupted reads. `None` at EOF.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        Ok((self.fill(&mut byte)? == 1).then_some(byte[0]))
    }
}

impl<R: Read> Read for ByteSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let n = if !self.replay.is_empty() {
            self.replay.read(buf)?
        } else {
            self.inner.read(buf)?
        };

        self.position += n as u64;
        Ok(n)
    }
}
