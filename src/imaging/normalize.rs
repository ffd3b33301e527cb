//! Adaptive PNG normalization.
//!
//! Wikis cap upload sizes and render galleries at modest resolutions, so
//! every asset is brought into a fixed footprint before upload:
//!
//! ```text
//! bytes ─decode─▶ RGBA8 ─fit to max_dimension─▶ base ─PNG─▶ ≤ max_bytes? ─yes─▶ done
//!                                                  ▲                  │ no
//!                                                  └── shrink by next ┘
//!                                                      cumulative scale
//! ```
//!
//! The shrink loop walks the cumulative scale down (1.0 → 0.9 → 0.8 …) and
//! resizes the *current* image by it each round. Sizes compound: after two
//! retries the fitted base has been scaled by 0.9 and then by 0.8, so its
//! edges are 0.72 of the base (each rounded to whole pixels along the way).
//!
//! PNG is lossless, so the only lever is pixel count. Once the minimum scale
//! is reached the smallest encoding is returned as-is: the result is
//! best-effort and carries `within_budget = false`.

use super::calculations::{cumulative_scale, fit_within, max_shrink_steps, scaled_dimensions};
use super::params::{NormalizeParams, NormalizedImage, RawImage};
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("PNG encode failed: {0}")]
    Encode(#[source] image::ImageError),
}

/// Normalize raw image bytes into a PNG within `params`.
///
/// Never upscales. Fails only when the input can't be decoded (or, in
/// practice never, when PNG encoding fails); an image that stays over the
/// byte budget at the minimum scale is returned, not rejected.
pub fn normalize(
    raw: &RawImage,
    params: &NormalizeParams,
) -> Result<NormalizedImage, NormalizeError> {
    let decoded = decode(raw)?.into_rgba8();
    let original = decoded.dimensions();
    let base_dims = fit_within(original, params.max_dimension);

    let mut current = if base_dims == original {
        decoded
    } else {
        debug!(
            from = ?original,
            to = ?base_dims,
            "downscaling to fit max dimension"
        );
        imageops::resize(&decoded, base_dims.0, base_dims.1, FilterType::Lanczos3)
    };

    let mut bytes = encode_png(&current)?;
    let mut scale = 1.0;
    let max_steps = max_shrink_steps(params.min_scale, params.scale_step);
    let mut steps = 0;

    while bytes.len() > params.max_bytes && steps < max_steps {
        steps += 1;
        scale = cumulative_scale(steps, params.scale_step, params.min_scale);
        let (w, h) = scaled_dimensions(current.dimensions(), scale);
        current = imageops::resize(&current, w, h, FilterType::Lanczos3);
        bytes = encode_png(&current)?;
        debug!(scale, width = w, height = h, size = bytes.len(), "shrunk");
    }

    let within_budget = bytes.len() <= params.max_bytes;
    if !within_budget {
        warn!(
            size = bytes.len(),
            budget = params.max_bytes,
            scale,
            "minimum scale reached, keeping oversized image"
        );
    }

    Ok(NormalizedImage {
        width: current.width(),
        height: current.height(),
        bytes,
        scale,
        within_budget,
    })
}

/// Decode using the format sniffed from the bytes, falling back to the
/// declared content type.
fn decode(raw: &RawImage) -> Result<image::DynamicImage, NormalizeError> {
    let format = image::guess_format(&raw.bytes).ok().or_else(|| {
        raw.content_type
            .as_deref()
            .and_then(|ct| ImageFormat::from_mime_type(ct.split(';').next().unwrap_or(ct).trim()))
    });

    let Some(format) = format else {
        return Err(NormalizeError::Decode(match &raw.content_type {
            Some(ct) => format!("unrecognized image data (declared {ct})"),
            None => "unrecognized image data".to_string(),
        }));
    };

    ImageReader::with_format(Cursor::new(&raw.bytes), format)
        .decode()
        .map_err(|e| NormalizeError::Decode(format!("{format:?}: {e}")))
}

/// Encode an RGBA8 buffer as PNG in memory.
pub(crate) fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, NormalizeError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(NormalizeError::Encode)?;
    Ok(buf)
}
