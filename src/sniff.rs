use serde::Serialize;

use crate::formats::jpeg::JPEG_SOI;
use crate::formats::png::PNG_SIGNATURE;

/// Prefix length inspected before choosing a parser.
pub const SNIFF_LEN: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Png,
    Jpeg,
    Other,
}

impl ContentType {
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(&PNG_SIGNATURE) {
            ContentType::Png
        } else if prefix.starts_with(&JPEG_SOI) && prefix.get(2) == Some(&0xFF) {
            ContentType::Jpeg
        } else {
            ContentType::Other
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Png => "image/png",
            ContentType::Jpeg => "image/jpeg",
            ContentType::Other => "application/octet-stream",
        }
    }
}
