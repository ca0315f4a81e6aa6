//! Output format ↔ extension ↔ mime-string mapping.
//!
//! The set of supported formats is fixed by the encoders compiled into the
//! [`raster`](crate::raster) backend: JPEG, PNG, WebP, and AVIF. Callers can
//! force a format explicitly; otherwise it is resolved from the source file's
//! extension, and an unrecognized extension aborts the transform before any
//! resize work starts.

use std::fmt;
use std::path::Path;

/// Recognized extension → format pairs. `jpg` and `jpeg` collapse onto the
/// same format.
const FORMAT_CANDIDATES: &[(&str, MimeType)] = &[
    ("jpg", MimeType::Jpeg),
    ("jpeg", MimeType::Jpeg),
    ("png", MimeType::Png),
    ("webp", MimeType::WebP),
    ("avif", MimeType::Avif),
];

/// An output image format, identified by its mime string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MimeType {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl MimeType {
    /// Resolve a format from a bare file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        FORMAT_CANDIDATES
            .iter()
            .find(|(candidate, _)| ext.eq_ignore_ascii_case(candidate))
            .map(|(_, mime)| *mime)
    }

    /// Resolve a format from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// The mime string, e.g. `image/jpeg`.
    pub fn as_str(self) -> &'static str {
        match self {
            MimeType::Jpeg => "image/jpeg",
            MimeType::Png => "image/png",
            MimeType::WebP => "image/webp",
            MimeType::Avif => "image/avif",
        }
    }

    /// The canonical file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            MimeType::Jpeg => "jpg",
            MimeType::Png => "png",
            MimeType::WebP => "webp",
            MimeType::Avif => "avif",
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
