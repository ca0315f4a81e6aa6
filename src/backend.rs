//! Resizing backend trait and shared request/result types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: `metadata` and `resize`. A backend is constructed from one source
//! image and holds the decoded pixels for the lifetime of a computation, so
//! `metadata` is cheap and `resize` never re-decodes.
//!
//! The production implementation is [`RasterBackend`](crate::raster::RasterBackend)
//! — pure Rust on the `image` crate, statically linked. Callers pick a
//! backend by constructing it; the orchestrator only sees this trait.

use crate::mime::MimeType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Source image dimensions, read once per computation and shared across all
/// resize calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Encoding options carried with every resize request.
///
/// `background` flattens alpha when encoding to a format without
/// transparency (JPEG); `rotate` is applied in whole quarter turns before
/// resampling, other angles are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeOptions {
    pub quality: Quality,
    pub background: Option<[u8; 3]>,
    pub rotate: u32,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            quality: Quality::default(),
            background: None,
            rotate: 0,
        }
    }
}

/// One unit of fan-out work: render the source at `width`, encoded as `mime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub width: u32,
    pub mime: MimeType,
    pub options: ResizeOptions,
}

/// An encoded variant produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeResult {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Trait for resizing backends.
///
/// `Sync` because resize requests for one computation run concurrently on
/// rayon's pool. Implementations must treat the decoded source as immutable
/// and work on an independent clone per `resize` call — concurrent calls
/// must not observe each other's mutations.
pub trait ImageBackend: Sync {
    /// Source dimensions. Invoked exactly once per computation.
    fn metadata(&self) -> Result<ImageMetadata, BackendError>;

    /// Render one encoded variant at the requested width.
    fn resize(&self, request: &ResizeRequest) -> Result<ResizeResult, BackendError>;
}
