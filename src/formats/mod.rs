pub mod jpeg;
pub mod png;

pub use jpeg::{JpegSegments, Marker};
pub use png::{ChunkType, PngSegments};
