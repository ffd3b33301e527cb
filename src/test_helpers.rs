//! Shared test utilities for the wikigal test suite.
//!
//! Provides synthetic image generators and in-memory collaborators so the
//! pipeline can be exercised without a network, a wiki, or a spreadsheet.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let images = FakeImages::new().with("https://x/a.png", solid_png(64, 64));
//! let wiki = FakeWiki::new().with_page("Gallery", "== Outfits ==\n<gallery>\n</gallery>");
//! let mut rows = MemoryRows::new(vec![upload_row("https://x/a.png", "Gallery", "Outfits")])
//!     .with_counter("Outfits", 1);
//! ```

use crate::imaging::RawImage;
use crate::sources::{FetchError, ImageSource};
use crate::types::{AssetCounters, RowRecord, RowStatus, UploadRow};
use crate::wiki::{MediaSink, PageStore, UploadMeta, WikiError};
use crate::workbook::{RowStore, WorkbookError};
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// =========================================================================
// Synthetic images
// =========================================================================

/// A single-colour PNG; compresses to almost nothing.
pub fn solid_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, image::Rgba([200, 80, 40, 255]));
    crate::imaging::encode_png(&img).unwrap()
}

/// A PNG of deterministic pseudo-random noise; PNG can't compress it, so
/// its size tracks the pixel count.
pub fn noise_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    let img = RgbaImage::from_fn(width, height, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let [r, g, b, _] = state.to_le_bytes();
        image::Rgba([r, g, b, 255])
    });
    crate::imaging::encode_png(&img).unwrap()
}

/// A small gradient JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

// =========================================================================
// Fixtures
// =========================================================================

/// Write workbook JSON into `dir` and return its path.
pub fn write_workbook(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("workbook.json");
    std::fs::write(&path, json).unwrap();
    path
}

/// A pending upload row with a designer and no layers.
pub fn upload_row(image: &str, page: &str, asset_type: &str) -> UploadRow {
    UploadRow {
        image: image.to_string(),
        page: page.to_string(),
        asset_type: asset_type.to_string(),
        designer: "Ana".to_string(),
        ..UploadRow::default()
    }
}

// =========================================================================
// In-memory collaborators
// =========================================================================

/// Image source backed by a URL → bytes map. Unknown URLs return HTTP 404.
#[derive(Default)]
pub struct FakeImages {
    images: HashMap<String, Vec<u8>>,
}

impl FakeImages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }
}

impl ImageSource for FakeImages {
    fn fetch(&self, url: &str) -> Result<RawImage, FetchError> {
        self.images
            .get(url)
            .map(|b| RawImage::with_content_type(b.clone(), "image/png"))
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// One recorded upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    pub filename: String,
    pub size: usize,
    pub meta: UploadMeta,
}

/// Wiki that keeps pages in memory and records uploads and edits.
///
/// Uses Mutex (not RefCell) so the trait methods can stay `&self`.
#[derive(Default)]
pub struct FakeWiki {
    pub pages: Mutex<HashMap<String, String>>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
    pub edits: Mutex<Vec<(String, String)>>,
    /// Number of upcoming uploads that fail with a dropped connection.
    pub drop_uploads: Mutex<u32>,
    /// Upload error returned for every upload, after dropped connections.
    pub reject_uploads: Option<String>,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, title: &str, text: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(title.to_string(), text.to_string());
        self
    }

    pub fn dropping_uploads(self, count: u32) -> Self {
        *self.drop_uploads.lock().unwrap() = count;
        self
    }

    pub fn rejecting_uploads(mut self, info: &str) -> Self {
        self.reject_uploads = Some(info.to_string());
        self
    }

    pub fn page(&self, title: &str) -> String {
        self.pages.lock().unwrap().get(title).cloned().unwrap_or_default()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.filename.clone())
            .collect()
    }
}

impl MediaSink for FakeWiki {
    fn upload(&self, filename: &str, bytes: &[u8], meta: &UploadMeta) -> Result<(), WikiError> {
        {
            let mut drops = self.drop_uploads.lock().unwrap();
            if *drops > 0 {
                *drops -= 1;
                return Err(WikiError::Connection("connection reset by peer".into()));
            }
        }
        if let Some(info) = &self.reject_uploads {
            return Err(WikiError::Api {
                code: "verification-error".into(),
                info: info.clone(),
            });
        }
        self.uploads.lock().unwrap().push(RecordedUpload {
            filename: filename.to_string(),
            size: bytes.len(),
            meta: meta.clone(),
        });
        Ok(())
    }
}

impl PageStore for FakeWiki {
    fn read_page(&self, title: &str) -> Result<String, WikiError> {
        self.pages
            .lock()
            .unwrap()
            .get(title)
            .cloned()
            .ok_or_else(|| WikiError::MissingPage(title.to_string()))
    }

    fn write_page(&self, title: &str, text: &str, summary: &str) -> Result<(), WikiError> {
        self.pages
            .lock()
            .unwrap()
            .insert(title.to_string(), text.to_string());
        self.edits
            .lock()
            .unwrap()
            .push((title.to_string(), summary.to_string()));
        Ok(())
    }
}

/// Row store over plain vectors.
#[derive(Debug, Default)]
pub struct MemoryRows {
    pub rows: Vec<UploadRow>,
    pub counters: AssetCounters,
    /// Every counter write, in order.
    pub counter_writes: Vec<(String, i64)>,
}

impl MemoryRows {
    pub fn new(rows: Vec<UploadRow>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn with_counter(mut self, asset_type: &str, next: i64) -> Self {
        self.counters.set(asset_type, next);
        self
    }
}

impl RowStore for MemoryRows {
    fn read_rows(&self) -> Result<Vec<RowRecord>, WorkbookError> {
        Ok(self
            .rows
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, row)| RowRecord { index, row })
            .collect())
    }

    fn write_row_status(
        &mut self,
        index: usize,
        status: RowStatus,
        reason: &str,
    ) -> Result<(), WorkbookError> {
        let row = self
            .rows
            .get_mut(index)
            .ok_or(WorkbookError::RowOutOfRange(index))?;
        row.process = status.to_string();
        row.reason = reason.to_string();
        Ok(())
    }

    fn write_row_number(&mut self, index: usize, number: i64) -> Result<(), WorkbookError> {
        let row = self
            .rows
            .get_mut(index)
            .ok_or(WorkbookError::RowOutOfRange(index))?;
        row.number = number.to_string();
        Ok(())
    }

    fn read_counters(&self) -> Result<AssetCounters, WorkbookError> {
        Ok(self.counters.clone())
    }

    fn write_counter(&mut self, asset_type: &str, next: i64) -> Result<(), WorkbookError> {
        self.counters.set(asset_type, next);
        self.counter_writes.push((asset_type.to_string(), next));
        Ok(())
    }
}
