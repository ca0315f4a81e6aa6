//! Resize orchestration and manifest assembly.
//!
//! One [`transform`] call is one computation: read metadata once, plan the
//! widths, fan one resize request per width out to the backend on rayon's
//! pool, rejoin, and fold the results into a [`Manifest`] through the
//! caller's file-emission callback. Where the generated bytes end up is the
//! callback's business — this module never writes variant files itself.
//!
//! If any single resize fails the whole computation fails; the emission
//! callback is never invoked for a batch that didn't complete.

use crate::backend::{BackendError, ImageBackend, ResizeOptions, ResizeRequest, ResizeResult};
use crate::manifest::{ImageEntry, Manifest};
use crate::mime::MimeType;
use crate::sizes::{SizeSpec, plan_widths};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default edge size of the dedicated low-resolution placeholder variant.
const DEFAULT_PLACEHOLDER_SIZE: u32 = 40;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("no supported mime type for extension '{0}'")]
    UnsupportedFormat(String),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Descriptor returned by the file-emission callback.
///
/// `src` is the srcset token (typically `<path> <width>w`), `path` the
/// emitted location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub src: String,
    pub path: String,
    pub width: u32,
    pub height: u32,
}

/// Parameters of one transform computation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformParams {
    pub source_path: PathBuf,
    pub sizes: SizeSpec,
    /// Output format override; resolved from the source extension when `None`.
    pub format: Option<MimeType>,
    /// Render a dedicated placeholder-sized variant and carry it as a
    /// data-URI alongside the manifest.
    pub placeholder: bool,
    pub placeholder_size: u32,
    /// Override the manifest's string coercion with a data-URI built from
    /// the first generated variant.
    pub inject_first: bool,
    /// Skip processing entirely and emit the untouched input as a synthetic
    /// 100×100 variant.
    pub disable: bool,
    pub options: ResizeOptions,
}

impl TransformParams {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            sizes: SizeSpec::Auto,
            format: None,
            placeholder: false,
            placeholder_size: DEFAULT_PLACEHOLDER_SIZE,
            inject_first: false,
            disable: false,
            options: ResizeOptions::default(),
        }
    }
}

/// Run one full computation: plan, fan out, fan in, assemble.
///
/// `emit` is invoked once per non-placeholder variant, in width-plan order,
/// only after every resize has succeeded.
pub fn transform<B, E>(
    backend: &B,
    params: &TransformParams,
    emit: &E,
) -> Result<Manifest, TransformError>
where
    B: ImageBackend,
    E: Fn(&ResizeResult) -> OutputFile,
{
    let mime = resolve_mime(params)?;

    if params.disable {
        return disabled_manifest(&params.source_path, emit);
    }

    let metadata = backend.metadata()?;
    let widths = plan_widths(metadata.width, &params.sizes);
    debug!(source = %params.source_path.display(), ?widths, %mime, "planned resize fan-out");

    let mut requests: Vec<ResizeRequest> = widths
        .iter()
        .map(|&width| ResizeRequest {
            width,
            mime,
            options: params.options.clone(),
        })
        .collect();
    if params.placeholder {
        requests.push(ResizeRequest {
            width: params.placeholder_size,
            mime,
            options: params.options.clone(),
        });
    }

    // Fan-out/fan-in: all requests run concurrently against the shared
    // decode, and the first failure rejects the whole batch.
    let mut results: Vec<ResizeResult> = requests
        .par_iter()
        .map(|request| backend.resize(request))
        .collect::<Result<_, BackendError>>()?;

    let placeholder = if params.placeholder {
        results.pop().map(|result| data_uri(mime, &result.data))
    } else {
        None
    };
    let inline = if params.inject_first {
        results.first().map(|result| data_uri(mime, &result.data))
    } else {
        None
    };

    let files: Vec<OutputFile> = results.iter().map(emit).collect();
    let default = files.last().expect("width plan is never empty");

    Ok(Manifest {
        src_set: files
            .iter()
            .map(|file| file.src.as_str())
            .collect::<Vec<_>>()
            .join(","),
        images: files
            .iter()
            .map(|file| ImageEntry {
                path: file.path.clone(),
                width: file.width,
                height: file.height,
            })
            .collect(),
        src: default.path.clone(),
        placeholder,
        inline,
        width: default.width,
        height: default.height,
    })
}

fn resolve_mime(params: &TransformParams) -> Result<MimeType, TransformError> {
    params
        .format
        .or_else(|| MimeType::from_path(&params.source_path))
        .ok_or_else(|| {
            let ext = params
                .source_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            TransformError::UnsupportedFormat(ext)
        })
}

/// Disabled mode: pass the untouched input bytes through the emission
/// callback as a single synthetic 100×100 variant.
fn disabled_manifest<E>(source_path: &Path, emit: &E) -> Result<Manifest, TransformError>
where
    E: Fn(&ResizeResult) -> OutputFile,
{
    let data = std::fs::read(source_path)?;
    let file = emit(&ResizeResult {
        data,
        width: 100,
        height: 100,
    });
    Ok(Manifest {
        src_set: file.path.clone(),
        images: vec![ImageEntry {
            path: file.path.clone(),
            width: 100,
            height: 100,
        }],
        src: file.path.clone(),
        placeholder: None,
        inline: None,
        width: 100,
        height: 100,
    })
}

fn data_uri(mime: MimeType, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(data))
}
