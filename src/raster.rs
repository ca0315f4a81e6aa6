//! Production resizing backend on the `image` crate — pure Rust, statically
//! linked.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `DynamicImage::resize` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` (alpha flattened first) |
//! | Encode → PNG / WebP | `DynamicImage::write_to` (lossless) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |
//!
//! The source is decoded once in [`RasterBackend::open`] and held for the
//! whole computation. Every `resize` call works on its own clone of the
//! decoded pixels, so concurrent calls on rayon's pool never observe each
//! other. AVIF is an output format only: the `image` crate's `"avif"`
//! feature enables just the encoder, so `.avif` sources fail to decode.

use crate::backend::{BackendError, ImageBackend, ImageMetadata, ResizeRequest, ResizeResult};
use crate::mime::MimeType;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Backend holding one decoded source image.
pub struct RasterBackend {
    image: DynamicImage,
}

impl RasterBackend {
    /// Decode the source image from disk.
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let image = ImageReader::open(path)
            .map_err(BackendError::Io)?
            .decode()
            .map_err(|e| {
                BackendError::Decode(format!("failed to decode {}: {}", path.display(), e))
            })?;
        Ok(Self { image })
    }
}

impl ImageBackend for RasterBackend {
    fn metadata(&self) -> Result<ImageMetadata, BackendError> {
        Ok(ImageMetadata {
            width: self.image.width(),
            height: self.image.height(),
        })
    }

    fn resize(&self, request: &ResizeRequest) -> Result<ResizeResult, BackendError> {
        // Each call gets an independent copy; the shared decode stays untouched.
        let rotated = match request.options.rotate % 360 {
            90 => self.image.rotate90(),
            180 => self.image.rotate180(),
            270 => self.image.rotate270(),
            _ => self.image.clone(),
        };
        let resized = rotated.resize(request.width, u32::MAX, FilterType::Lanczos3);
        let data = encode(&resized, request)?;
        Ok(ResizeResult {
            data,
            width: resized.width(),
            height: resized.height(),
        })
    }
}

/// Encode a resized image into the requested format.
fn encode(img: &DynamicImage, request: &ResizeRequest) -> Result<Vec<u8>, BackendError> {
    let quality = request.options.quality.value() as u8;
    let mut buffer = Cursor::new(Vec::new());

    match request.mime {
        MimeType::Jpeg => {
            let flattened = flatten_alpha(img, request.options.background);
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            flattened
                .write_with_encoder(encoder)
                .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {}", e)))?;
        }
        MimeType::Png => {
            img.write_to(&mut buffer, ImageFormat::Png)
                .map_err(|e| BackendError::Encode(format!("PNG encode failed: {}", e)))?;
        }
        MimeType::WebP => {
            // The pure-Rust WebP encoder is lossless; quality does not apply.
            img.write_to(&mut buffer, ImageFormat::WebP)
                .map_err(|e| BackendError::Encode(format!("WebP encode failed: {}", e)))?;
        }
        MimeType::Avif => {
            let encoder = AvifEncoder::new_with_speed_quality(&mut buffer, 6, quality);
            img.write_with_encoder(encoder)
                .map_err(|e| BackendError::Encode(format!("AVIF encode failed: {}", e)))?;
        }
    }

    Ok(buffer.into_inner())
}

/// Composite an image with alpha over a solid background, for encoders
/// without transparency. Opaque images pass through as RGB8.
fn flatten_alpha(img: &DynamicImage, background: Option<[u8; 3]>) -> DynamicImage {
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let [bg_r, bg_g, bg_b] = background.unwrap_or([255, 255, 255]);
    let rgba = img.to_rgba8();
    let mut flat = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u16;
        let blend = |fg: u8, bg: u8| -> u8 {
            ((fg as u16 * alpha + bg as u16 * (255 - alpha)) / 255) as u8
        };
        flat.put_pixel(
            x,
            y,
            image::Rgb([blend(r, bg_r), blend(g, bg_g), blend(b, bg_b)]),
        );
    }
    DynamicImage::ImageRgb8(flat)
}
