//! Parameter types for image normalization.
//!
//! These structs describe *what* the normalizer must achieve, not *how*. They
//! are built from [`ImagesConfig`](crate::config::ImagesConfig) by the
//! pipeline and passed straight to [`normalize`](super::normalize).
//!
//! ## Types
//!
//! - [`NormalizeParams`]: dimension limit, byte budget, and the shrink schedule.
//! - [`RawImage`]: undecoded bytes with the content type the server declared.
//! - [`NormalizedImage`]: the PNG result plus what it took to get there.

use crate::config::ImagesConfig;

/// Limits and shrink schedule for [`normalize`](super::normalize).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeParams {
    /// Longest allowed edge in pixels.
    pub max_dimension: u32,
    /// Byte budget for the encoded PNG.
    pub max_bytes: usize,
    /// Smallest cumulative scale the shrink loop may reach.
    pub min_scale: f64,
    /// Decrement applied to the cumulative scale per retry.
    pub scale_step: f64,
}

impl NormalizeParams {
    pub fn from_config(config: &ImagesConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            max_bytes: config.max_bytes,
            min_scale: config.min_scale,
            scale_step: config.scale_step,
        }
    }
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self::from_config(&ImagesConfig::default())
    }
}

/// Undecoded image bytes as fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    /// `Content-Type` as declared by the source, if any. Only consulted when
    /// the bytes themselves don't identify the format.
    pub content_type: Option<String>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
        }
    }

    pub fn with_content_type(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: Some(content_type.into()),
        }
    }
}

/// PNG-encoded output of the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Last cumulative scale of the shrink loop (1.0 = no shrink).
    pub scale: f64,
    /// False when the minimum scale was reached and the PNG is still larger
    /// than the byte budget.
    pub within_budget: bool,
}

impl NormalizedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
