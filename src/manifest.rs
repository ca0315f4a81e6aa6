//! The manifest describing one generated image set.
//!
//! This is both the value returned to callers and the payload persisted by
//! the [`cache`](crate::cache) — it round-trips through JSON, so every field
//! is serde-visible and equality is structural.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One generated variant as recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

/// Everything a caller needs to reference the generated set.
///
/// `src`, `width`, and `height` describe the default image: the last entry
/// produced after width deduplication, which is not necessarily the largest.
/// `placeholder` carries the data-URI of the dedicated low-resolution
/// variant when one was requested. `inline` overrides the string coercion
/// with a data-URI built from the first generated variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Comma-joined `src` tokens of every variant, e.g. `a.jpg 100w,b.jpg 200w`.
    pub src_set: String,
    pub images: Vec<ImageEntry>,
    /// Path of the default image.
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Manifest {
    /// The string-coercion value: the inline data-URI when inject-first was
    /// requested, otherwise the default image's path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.inline.as_deref().unwrap_or(&self.src))
    }
}
