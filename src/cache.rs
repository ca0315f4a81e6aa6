//! Content-addressed manifest cache for incremental builds.
//!
//! Resizing and re-encoding a handful of variants per source image is the
//! expensive part of a build. This module wraps the whole transform
//! computation behind an on-disk store so repeated builds with unchanged
//! inputs skip it entirely.
//!
//! # Design
//!
//! ## Cache keys
//!
//! Entries are keyed by the SHA-256 digest of the JSON-serialized pair
//! `{source, identifier}` — the source *path* and a caller-supplied
//! identifier string that typically encodes the effective option set.
//! Changing any option therefore changes the key, but changing the file's
//! bytes without touching path or identifier does **not** invalidate the
//! entry. That is a deliberate limitation: callers who need content-aware
//! invalidation fold a content hash into the identifier.
//!
//! ## Storage
//!
//! One file per entry, `<hex-digest>.json` (or `.json.gz` when compression
//! is on), containing the serialized [`Manifest`]. A read or parse failure
//! of any kind is treated as a miss.
//!
//! ## Directory resolution and fallback
//!
//! The directory is resolved once per [`DiskCache`] at construction: the
//! explicit override when given, otherwise `.cache/srcset-gen` under the
//! nearest ancestor of the working directory that looks like a project
//! root, falling back to the system temp directory. When the active
//! directory cannot be created or written and it was neither an explicit
//! override nor already the temp directory, handling retries once rooted at
//! the temp directory; otherwise the failure propagates — even when a valid
//! manifest was already computed.
//!
//! ## Concurrency
//!
//! There is no single-flight protection: two concurrent computations for
//! the same key may both miss, both compute, and both write. Writes are
//! idempotent and keyed identically, so the race wastes work without
//! corrupting anything.

use crate::backend::{ImageBackend, ResizeResult};
use crate::manifest::Manifest;
use crate::transform::{OutputFile, TransformError, TransformParams, transform};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache entry error: {0}")]
    Entry(#[from] serde_json::Error),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Construction-time cache configuration.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Explicit cache directory. `None` resolves the project-local default.
    pub directory: Option<PathBuf>,
    /// Caller-supplied key component, typically the serialized option set.
    pub identifier: String,
    /// Gzip entries on disk (`.json.gz`).
    pub compression: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            directory: None,
            identifier: String::new(),
            compression: true,
        }
    }
}

/// Hash-keyed on-disk manifest store wrapping the transform pipeline.
///
/// The directory is resolved once at construction and reused for every
/// call on this instance.
pub struct DiskCache {
    directory: PathBuf,
    /// Whether `directory` was an explicit caller override. Explicit
    /// directories never fall back.
    explicit: bool,
    identifier: String,
    compression: bool,
}

impl DiskCache {
    pub fn new(options: CacheOptions) -> Self {
        let (directory, explicit) = match options.directory {
            Some(directory) => (directory, true),
            None => (default_cache_directory(), false),
        };
        Self {
            directory,
            explicit,
            identifier: options.identifier,
            compression: options.compression,
        }
    }

    /// Return the cached manifest for these parameters, or run the
    /// transform pipeline exactly once and persist its result.
    pub fn transform<B, E>(
        &self,
        backend: &B,
        params: &TransformParams,
        emit: &E,
    ) -> Result<Manifest, CacheError>
    where
        B: ImageBackend,
        E: Fn(&ResizeResult) -> OutputFile,
    {
        let filename = entry_filename(&params.source_path, &self.identifier)?;
        self.handle(&self.directory, &filename, backend, params, emit)
    }

    fn handle<B, E>(
        &self,
        directory: &Path,
        filename: &str,
        backend: &B,
        params: &TransformParams,
        emit: &E,
    ) -> Result<Manifest, CacheError>
    where
        B: ImageBackend,
        E: Fn(&ResizeResult) -> OutputFile,
    {
        let file = entry_path(&directory.join(filename), self.compression);

        // No errors mean the entry was previously cached; any failure —
        // missing file, truncated gzip, stale JSON — is a miss.
        if let Ok(manifest) = read_entry(&file, self.compression) {
            debug!(entry = %file.display(), "cache hit");
            return Ok(manifest);
        }
        debug!(entry = %file.display(), "cache miss");

        let fallback = !self.explicit && directory != std::env::temp_dir();

        if let Err(err) = std::fs::create_dir_all(directory) {
            if fallback {
                warn!(
                    directory = %directory.display(),
                    error = %err,
                    "cache directory not creatable, retrying in temp dir"
                );
                return self.handle(&std::env::temp_dir(), filename, backend, params, emit);
            }
            return Err(err.into());
        }

        let manifest = transform(backend, params, emit)?;

        if let Err(err) = write_entry(&file, self.compression, &manifest) {
            if fallback {
                warn!(
                    entry = %file.display(),
                    error = %err,
                    "cache entry not writable, retrying in temp dir"
                );
                return self.handle(&std::env::temp_dir(), filename, backend, params, emit);
            }
            return Err(err);
        }

        Ok(manifest)
    }
}

/// `<hex-digest>.json` for the JSON-serialized (source path, identifier) pair.
fn entry_filename(source_path: &Path, identifier: &str) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct Key<'a> {
        source: &'a str,
        identifier: &'a str,
    }

    let source = source_path.to_string_lossy();
    let json = serde_json::to_string(&Key {
        source: &source,
        identifier,
    })?;
    let digest = Sha256::digest(json.as_bytes());
    Ok(format!("{:x}.json", digest))
}

/// Append `.gz` to the entry file name when compression is on.
fn entry_path(file: &Path, compress: bool) -> PathBuf {
    if compress {
        let mut path = file.as_os_str().to_owned();
        path.push(".gz");
        PathBuf::from(path)
    } else {
        file.to_path_buf()
    }
}

fn read_entry(file: &Path, compress: bool) -> Result<Manifest, CacheError> {
    let raw = std::fs::read(file)?;
    let bytes = if compress {
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
        decoded
    } else {
        raw
    };
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_entry(file: &Path, compress: bool, manifest: &Manifest) -> Result<(), CacheError> {
    let json = serde_json::to_vec(manifest)?;
    let data = if compress {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?
    } else {
        json
    };
    std::fs::write(file, data)?;
    Ok(())
}

/// Project-local default: `.cache/srcset-gen` under the nearest ancestor of
/// the working directory carrying a project marker, else the temp dir.
fn default_cache_directory() -> PathBuf {
    let Ok(cwd) = std::env::current_dir() else {
        return std::env::temp_dir();
    };
    for dir in cwd.ancestors() {
        if dir.join("Cargo.toml").exists()
            || dir.join("package.json").exists()
            || dir.join(".git").exists()
        {
            return dir.join(".cache").join(env!("CARGO_PKG_NAME"));
        }
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::MockBackend;
    use crate::sizes::SizeSpec;
    use std::fs;
    use tempfile::TempDir;

    fn emit(result: &ResizeResult) -> OutputFile {
        let path = format!("img-{}.jpg", result.width);
        OutputFile {
            src: format!("{} {}w", path, result.width),
            path,
            width: result.width,
            height: result.height,
        }
    }

    fn params() -> TransformParams {
        TransformParams {
            sizes: SizeSpec::Widths(vec![100, 200]),
            ..TransformParams::new("/photos/test.jpg")
        }
    }

    fn cache_at(directory: &Path, identifier: &str) -> DiskCache {
        DiskCache {
            directory: directory.to_path_buf(),
            explicit: true,
            identifier: identifier.to_string(),
            compression: false,
        }
    }

    // =========================================================================
    // Key derivation
    // =========================================================================

    #[test]
    fn entry_filename_is_deterministic() {
        let a = entry_filename(Path::new("/a/b.jpg"), "opts").unwrap();
        let b = entry_filename(Path::new("/a/b.jpg"), "opts").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64 + ".json".len());
        assert!(a.ends_with(".json"));
    }

    #[test]
    fn entry_filename_varies_with_path_and_identifier() {
        let base = entry_filename(Path::new("/a/b.jpg"), "opts").unwrap();
        assert_ne!(base, entry_filename(Path::new("/a/c.jpg"), "opts").unwrap());
        assert_ne!(base, entry_filename(Path::new("/a/b.jpg"), "other").unwrap());
    }

    // =========================================================================
    // Hit / miss behavior
    // =========================================================================

    #[test]
    fn miss_computes_and_persists_an_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_at(tmp.path(), "v1");
        let backend = MockBackend::new(800, 600);

        let manifest = cache.transform(&backend, &params(), &emit).unwrap();

        assert_eq!(manifest.images.len(), 2);
        assert_eq!(backend.resize_count(), 2);

        let filename = entry_filename(Path::new("/photos/test.jpg"), "v1").unwrap();
        assert!(tmp.path().join(filename).exists());
    }

    #[test]
    fn hit_returns_persisted_manifest_without_compute() {
        let tmp = TempDir::new().unwrap();

        let first = cache_at(tmp.path(), "v1")
            .transform(&MockBackend::new(800, 600), &params(), &emit)
            .unwrap();

        let backend = MockBackend::new(800, 600);
        let second = cache_at(tmp.path(), "v1")
            .transform(&backend, &params(), &emit)
            .unwrap();

        assert_eq!(second, first);
        // Neither metadata nor resize ran on the hit
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn hit_leaves_the_entry_bytes_untouched() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_at(tmp.path(), "v1");
        cache
            .transform(&MockBackend::new(800, 600), &params(), &emit)
            .unwrap();

        let filename = entry_filename(Path::new("/photos/test.jpg"), "v1").unwrap();
        let before = fs::read(tmp.path().join(&filename)).unwrap();

        cache
            .transform(&MockBackend::new(800, 600), &params(), &emit)
            .unwrap();
        let after = fs::read(tmp.path().join(&filename)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn identifier_change_forces_recompute() {
        let tmp = TempDir::new().unwrap();
        cache_at(tmp.path(), "v1")
            .transform(&MockBackend::new(800, 600), &params(), &emit)
            .unwrap();

        let backend = MockBackend::new(800, 600);
        cache_at(tmp.path(), "v2")
            .transform(&backend, &params(), &emit)
            .unwrap();

        assert_eq!(backend.resize_count(), 2);
    }

    #[test]
    fn source_byte_change_does_not_invalidate() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("photo.jpg");
        fs::write(&source, b"original bytes").unwrap();

        let params = TransformParams {
            sizes: SizeSpec::Widths(vec![100]),
            ..TransformParams::new(&source)
        };
        let cache = cache_at(tmp.path(), "v1");
        cache
            .transform(&MockBackend::new(800, 600), &params, &emit)
            .unwrap();

        // Rewrite the file contents; path and identifier are unchanged
        fs::write(&source, b"completely different bytes").unwrap();

        let backend = MockBackend::new(800, 600);
        cache.transform(&backend, &params, &emit).unwrap();
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_at(tmp.path(), "v1");
        let filename = entry_filename(Path::new("/photos/test.jpg"), "v1").unwrap();
        fs::write(tmp.path().join(&filename), "not json").unwrap();

        let backend = MockBackend::new(800, 600);
        let manifest = cache.transform(&backend, &params(), &emit).unwrap();

        assert_eq!(backend.resize_count(), 2);
        assert_eq!(manifest.images.len(), 2);
        // Entry was rewritten with a valid manifest
        let reread = read_entry(&tmp.path().join(&filename), false).unwrap();
        assert_eq!(reread, manifest);
    }

    // =========================================================================
    // Compression
    // =========================================================================

    #[test]
    fn compressed_entries_use_gz_suffix_and_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskCache {
            compression: true,
            ..cache_at(tmp.path(), "v1")
        };

        let first = cache
            .transform(&MockBackend::new(800, 600), &params(), &emit)
            .unwrap();

        let filename = entry_filename(Path::new("/photos/test.jpg"), "v1").unwrap();
        let gz_path = tmp.path().join(format!("{filename}.gz"));
        assert!(gz_path.exists());
        let raw = fs::read(&gz_path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);

        let backend = MockBackend::new(800, 600);
        let second = cache.transform(&backend, &params(), &emit).unwrap();
        assert_eq!(second, first);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn compression_flag_selects_which_entry_is_visible() {
        let tmp = TempDir::new().unwrap();
        cache_at(tmp.path(), "v1")
            .transform(&MockBackend::new(800, 600), &params(), &emit)
            .unwrap();

        // A compressed-mode cache does not see the uncompressed entry
        let cache = DiskCache {
            compression: true,
            ..cache_at(tmp.path(), "v1")
        };
        let backend = MockBackend::new(800, 600);
        cache.transform(&backend, &params(), &emit).unwrap();
        assert_eq!(backend.resize_count(), 2);
    }

    // =========================================================================
    // Fallback and failure propagation
    // =========================================================================

    /// A path that cannot be created because a component is a regular file.
    fn uncreatable_dir(tmp: &TempDir) -> PathBuf {
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        blocker.join("cache")
    }

    #[test]
    fn uncreatable_directory_falls_back_to_temp() {
        let tmp = TempDir::new().unwrap();
        // Unique identifier so the temp-dir entry cannot collide across runs
        let identifier = tmp.path().to_string_lossy().to_string();
        let cache = DiskCache {
            explicit: false,
            ..cache_at(&uncreatable_dir(&tmp), &identifier)
        };

        let backend = MockBackend::new(800, 600);
        let manifest = cache.transform(&backend, &params(), &emit).unwrap();
        assert_eq!(manifest.images.len(), 2);

        let filename = entry_filename(Path::new("/photos/test.jpg"), &identifier).unwrap();
        let entry = std::env::temp_dir().join(filename);
        assert!(entry.exists());
        fs::remove_file(entry).unwrap();
    }

    #[test]
    fn explicit_uncreatable_directory_propagates() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_at(&uncreatable_dir(&tmp), "v1");

        let result = cache.transform(&MockBackend::new(800, 600), &params(), &emit);
        assert!(matches!(result, Err(CacheError::Io(_))));
    }

    #[test]
    fn explicit_write_failure_propagates_after_compute() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_at(tmp.path(), "v1");

        // Occupy the entry's file name with a directory so the write fails
        let filename = entry_filename(Path::new("/photos/test.jpg"), "v1").unwrap();
        fs::create_dir(tmp.path().join(&filename)).unwrap();

        let backend = MockBackend::new(800, 600);
        let result = cache.transform(&backend, &params(), &emit);

        // The pipeline ran, but the write failure still surfaces
        assert_eq!(backend.resize_count(), 2);
        assert!(matches!(result, Err(CacheError::Io(_))));
    }

    #[test]
    fn transform_failure_propagates_unwrapped() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_at(tmp.path(), "v1");
        let backend = MockBackend::failing_at(800, 600, 100);

        let result = cache.transform(&backend, &params(), &emit);
        assert!(matches!(result, Err(CacheError::Transform(_))));
    }
}
