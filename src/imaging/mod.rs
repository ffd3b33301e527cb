//! Image normalization in pure Rust, no I/O.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode** | `image::guess_format` + `ImageReader` (JPEG, PNG, TIFF, WebP, GIF) |
//! | **Fit** | `imageops::resize` with `Lanczos3` |
//! | **Encode** | `image::codecs::png::PngEncoder` into a `Vec<u8>` |
//! | **Shrink loop** | cumulative scale schedule from [`calculations`] |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and scale math (unit testable)
//! - **Parameters**: Limits and the input/output value types
//! - **Normalize**: The decode → fit → encode → shrink pipeline

mod calculations;
mod normalize;
mod params;

pub use calculations::{fit_within, scaled_dimensions};
pub use normalize::{NormalizeError, normalize};
pub use params::{NormalizeParams, NormalizedImage, RawImage};
#[cfg(test)]
pub(crate) use normalize::encode_png;
