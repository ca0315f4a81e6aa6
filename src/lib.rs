//! # srcset-gen
//!
//! Turn one source image into a set of resized variants plus a manifest
//! describing them — a width-indexed source set, an optional low-resolution
//! placeholder, and a default image — and memoize the entire computation on
//! disk so repeated builds skip re-resizing.
//!
//! # Architecture: Plan → Fan Out → Assemble, Wrapped in a Cache
//!
//! One computation flows through three stages, with the cache deciding
//! whether it runs at all:
//!
//! ```text
//! DiskCache ── hit ──────────────────────────────▶ Manifest
//!     │ miss
//!     ▼
//! plan_widths   SizeSpec → [100, 200, 300, 400]   (pure)
//!     ▼
//! ImageBackend  one resize per width, concurrent  (rayon fan-out)
//!     ▼
//! Manifest      emission callback + srcset/placeholder assembly
//! ```
//!
//! The stages are separated for the same reasons the split exists anywhere:
//!
//! - **Testability**: width planning is a pure function; orchestration runs
//!   against a recording mock backend; the cache is exercised with byte
//!   fixtures. None of the pipeline tests decode a single pixel.
//! - **Swappability**: the resampling implementation sits behind the
//!   [`ImageBackend`] trait, so callers pick a backend by constructing one.
//! - **Incremental builds**: the cache wraps the whole computation, not
//!   individual resizes, so a hit costs one file read.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`sizes`] | Width planning — clamp, interpolate, deduplicate |
//! | [`backend`] | `ImageBackend` trait and request/result types |
//! | [`raster`] | Production backend on the `image` crate |
//! | [`mime`] | Format ↔ extension ↔ mime-string mapping |
//! | [`transform`] | Resize orchestration and manifest assembly |
//! | [`manifest`] | The `Manifest` result type |
//! | [`cache`] | Content-addressed, gzip-optional on-disk store |
//!
//! # Design Decisions
//!
//! ## Path-Addressed, Not Content-Addressed Keys
//!
//! Cache keys hash the source *path* plus a caller-supplied identifier,
//! never the file bytes. Hashing every source on every build would cost a
//! full read per image just to confirm a hit; encoding the option set into
//! the identifier keeps key derivation free while still invalidating on any
//! configuration change. The flip side — edits to a file's bytes alone do
//! not invalidate — is documented on [`cache`], and callers who need
//! content awareness fold their own digest into the identifier.
//!
//! ## Decode Once, Clone Per Resize
//!
//! A backend decodes its source a single time and serves every resize from
//! an independent clone of those pixels. With rayon fanning one task per
//! width, cloning is what keeps concurrent Lanczos passes from observing
//! each other; the decoded original is shared strictly read-only.
//!
//! ## All-or-Nothing Orchestration
//!
//! If any width fails to render, the whole computation fails and the
//! file-emission callback never runs. A build either gets the complete
//! variant set or a single terminal error — there is no partial manifest to
//! reason about downstream.
//!
//! ## Emission Is the Caller's Problem
//!
//! The core never chooses file names or writes variant bytes. The injected
//! callback receives each [`ResizeResult`](backend::ResizeResult) and
//! returns the `{src, path, width, height}` descriptor the manifest is
//! assembled from, so the same pipeline serves webpack-style emit-to-output
//! builds, in-memory tests, and anything between.

pub mod backend;
pub mod cache;
pub mod manifest;
pub mod mime;
pub mod raster;
pub mod sizes;
pub mod transform;

pub use backend::{
    BackendError, ImageBackend, ImageMetadata, Quality, ResizeOptions, ResizeRequest, ResizeResult,
};
pub use cache::{CacheError, CacheOptions, DiskCache};
pub use manifest::{ImageEntry, Manifest};
pub use mime::MimeType;
pub use raster::RasterBackend;
pub use sizes::{SizeSpec, plan_widths};
pub use transform::{OutputFile, TransformError, TransformParams, transform};
