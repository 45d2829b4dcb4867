pub mod error;
pub mod file;
pub mod filter;
pub mod formats;
pub mod io;
pub mod scrubber;
pub mod segment;
pub mod sniff;

pub use error::{Result, ScrubError};
pub use file::{scrub_file, ScrubReport};
pub use filter::{FilteringStream, ScrubStats};
pub use formats::{ChunkType, JpegSegments, Marker, PngSegments};
pub use io::ByteSource;
pub use scrubber::{scrub, Scrubber};
pub use segment::{Segment, SegmentKind, SegmentReader, SegmentSource};
pub use sniff::{ContentType, SNIFF_LEN};
