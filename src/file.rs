use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::filter::ScrubStats;
use crate::scrubber::Scrubber;
use crate::sniff::ContentType;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScrubReport {
    pub content_type: ContentType,
    pub bytes_written: u64,
    pub stats: Option<ScrubStats>,
}

/// Scrubs `input` into a newly created `output`.
///
/// On error the output file may hold a partial, invalid image.
pub fn scrub_file(input: &Path, output: &Path) -> io::Result<ScrubReport> {
    let reader = BufReader::new(File::open(input)?);
    let mut scrubber = Scrubber::new(reader)?;

    let mut out = BufWriter::new(File::create(output)?);
    let bytes_written = io::copy(&mut scrubber, &mut out)?;
    out.flush()?;
    out.get_ref().sync_all()?;

    let report = ScrubReport {
        content_type: scrubber.content_type(),
        bytes_written,
        stats: scrubber.stats().copied(),
    };

    info!(
        input = %input.display(),
        output = %output.display(),
        mime = report.content_type.mime(),
        bytes_written,
        "scrubbed file"
    );
    Ok(report)
}
