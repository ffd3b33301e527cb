//! Workbook row store.
//!
//! The workflow is tracked in two sheets:
//!
//! - **upload**: one row per asset to publish, with a `Process` status and
//!   a `Reason` column the pipeline writes back.
//! - **content**: the next free number per asset type.
//!
//! [`RowStore`] is the seam the pipeline uses. [`JsonWorkbook`] keeps both
//! sheets in one JSON file, using the spreadsheet's column headers as keys:
//!
//! ```json
//! {
//!   "upload": [
//!     {"Image": "https://…/a.png", "Page": "Outfit Gallery", "Type": "Outfits",
//!      "Number": "", "Asset Designer": "Ana", "Layers": "", "Process": "", "Reason": ""}
//!   ],
//!   "content": [{"Type": "Outfits", "Number": 12}]
//! }
//! ```
//!
//! Every write is persisted immediately, like a spreadsheet cell update, so
//! an interrupted run leaves the file consistent with the wiki.

use crate::types::{AssetCounters, RowRecord, RowStatus, UploadRow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No upload row at index {0}")]
    RowOutOfRange(usize),
    #[error("No content row for type {0:?}")]
    UnknownType(String),
}

/// Row-level access to the workflow sheets.
pub trait RowStore {
    /// Every row of the upload sheet, in sheet order.
    fn read_rows(&self) -> Result<Vec<RowRecord>, WorkbookError>;

    /// Rows still waiting to be published.
    fn read_pending_rows(&self) -> Result<Vec<RowRecord>, WorkbookError> {
        Ok(self
            .read_rows()?
            .into_iter()
            .filter(RowRecord::is_pending)
            .collect())
    }

    fn write_row_status(
        &mut self,
        index: usize,
        status: RowStatus,
        reason: &str,
    ) -> Result<(), WorkbookError>;

    fn write_row_number(&mut self, index: usize, number: i64) -> Result<(), WorkbookError>;

    /// Counters from the content sheet. Rows without an integer number are skipped.
    fn read_counters(&self) -> Result<AssetCounters, WorkbookError>;

    fn write_counter(&mut self, asset_type: &str, next: i64) -> Result<(), WorkbookError>;
}

/// One row of the `content` sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRow {
    #[serde(rename = "Type")]
    pub asset_type: String,
    /// Kept as raw JSON: the sheet may hold blanks or text here.
    #[serde(rename = "Number", default)]
    pub number: Value,
}

/// Both sheets as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default)]
    pub upload: Vec<UploadRow>,
    #[serde(default)]
    pub content: Vec<ContentRow>,
}

/// A [`Workbook`] backed by a JSON file.
#[derive(Debug)]
pub struct JsonWorkbook {
    path: PathBuf,
    book: Workbook,
}

impl JsonWorkbook {
    pub fn open(path: &Path) -> Result<Self, WorkbookError> {
        let content = fs::read_to_string(path)?;
        let book: Workbook = serde_json::from_str(&content)?;
        debug!(
            path = %path.display(),
            rows = book.upload.len(),
            types = book.content.len(),
            "workbook loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            book,
        })
    }

    pub fn workbook(&self) -> &Workbook {
        &self.book
    }

    fn save(&self) -> Result<(), WorkbookError> {
        let json = serde_json::to_string_pretty(&self.book)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn row_mut(&mut self, index: usize) -> Result<&mut UploadRow, WorkbookError> {
        self.book
            .upload
            .get_mut(index)
            .ok_or(WorkbookError::RowOutOfRange(index))
    }
}

impl RowStore for JsonWorkbook {
    fn read_rows(&self) -> Result<Vec<RowRecord>, WorkbookError> {
        Ok(self
            .book
            .upload
            .iter()
            .enumerate()
            .map(|(index, row)| RowRecord {
                index,
                row: row.clone(),
            })
            .collect())
    }

    fn write_row_status(
        &mut self,
        index: usize,
        status: RowStatus,
        reason: &str,
    ) -> Result<(), WorkbookError> {
        let row = self.row_mut(index)?;
        row.process = status.to_string();
        row.reason = reason.to_string();
        self.save()
    }

    fn write_row_number(&mut self, index: usize, number: i64) -> Result<(), WorkbookError> {
        self.row_mut(index)?.number = number.to_string();
        self.save()
    }

    /// The first row of each type holds its counter, the same row
    /// `write_counter` updates. Later rows of that type are ignored.
    fn read_counters(&self) -> Result<AssetCounters, WorkbookError> {
        let mut seen = HashSet::new();
        let mut counters = AssetCounters::new();
        for row in &self.book.content {
            let asset_type = row.asset_type.trim();
            if !seen.insert(asset_type) {
                continue;
            }
            if let Some(next) = row.number.as_i64() {
                counters.set(asset_type, next);
            }
        }
        Ok(counters)
    }

    fn write_counter(&mut self, asset_type: &str, next: i64) -> Result<(), WorkbookError> {
        let row = self
            .book
            .content
            .iter_mut()
            .find(|c| c.asset_type.trim() == asset_type)
            .ok_or_else(|| WorkbookError::UnknownType(asset_type.to_string()))?;
        row.number = Value::from(next);
        self.save()
    }
}
