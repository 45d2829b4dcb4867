use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrubError {
    /// A structural field (marker, length, chunk type, signature) could not be
    /// parsed. `source` holds the underlying cause, usually an unexpected EOF.
    #[error("malformed data: {context}: {source}")]
    MalformedData {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("segment source already failed")]
    Poisoned,
}

impl ScrubError {
    pub(crate) fn malformed(context: &'static str, source: io::Error) -> Self {
        ScrubError::MalformedData { context, source }
    }

    /// Structural inconsistency that did not come from the byte source itself.
    pub(crate) fn inconsistent(context: &'static str, detail: impl Into<String>) -> Self {
        ScrubError::MalformedData {
            context,
            source: io::Error::new(io::ErrorKind::InvalidData, detail.into()),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ScrubError::MalformedData { .. })
    }
}

impl From<ScrubError> for io::Error {
    fn from(err: ScrubError) -> Self {
        match err {
            ScrubError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrubError>;
