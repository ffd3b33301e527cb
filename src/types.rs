//! Shared types passed between the workbook, the pipeline, and the output
//! formatter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One row of the `upload` sheet.
///
/// Field names follow the sheet's column headers so a workbook exported from
/// the spreadsheet deserializes without a mapping step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRow {
    /// Source URL of the image.
    #[serde(rename = "Image")]
    pub image: String,
    /// Wiki page holding the gallery.
    #[serde(rename = "Page")]
    pub page: String,
    /// Asset type: names the file and the page section.
    #[serde(rename = "Type")]
    pub asset_type: String,
    /// Number assigned when the row was last attempted.
    #[serde(rename = "Number", default)]
    pub number: String,
    #[serde(rename = "Asset Designer", default)]
    pub designer: String,
    /// Comma-separated links to layer images.
    #[serde(rename = "Layers", default)]
    pub layers: String,
    /// Workflow status: empty, `Successful`, `Failed`, `Skip`, `Hold`.
    #[serde(rename = "Process", default)]
    pub process: String,
    /// Failure reason written back by the pipeline.
    #[serde(rename = "Reason", default)]
    pub reason: String,
}

impl UploadRow {
    pub fn mark(&self) -> ProcessMark {
        ProcessMark::parse(&self.process)
    }
}

/// A row paired with its position in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    /// 0-based position in the `upload` sheet.
    pub index: usize,
    pub row: UploadRow,
}

impl RowRecord {
    pub fn is_pending(&self) -> bool {
        self.row.mark().is_pending()
    }
}

/// Parsed value of the `Process` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMark {
    /// Never attempted (or an unrecognized value).
    New,
    /// Previous attempt failed; retried with upload warnings ignored.
    Failed,
    Successful,
    Skip,
    Hold,
}

impl ProcessMark {
    /// Case-insensitive, whitespace-tolerant parse. Unknown values count as new.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "successful" => ProcessMark::Successful,
            "skip" => ProcessMark::Skip,
            "hold" => ProcessMark::Hold,
            "failed" => ProcessMark::Failed,
            _ => ProcessMark::New,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, ProcessMark::New | ProcessMark::Failed)
    }
}

/// Status written to the `Process` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Successful,
    Failed,
}

impl RowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::Successful => "Successful",
            RowStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Successful,
    Failed(String),
    Skipped,
}

impl RowOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        RowOutcome::Failed(reason.into())
    }
}

/// Next free number per asset type, from the `content` sheet.
///
/// Owned by the pipeline and handed from row to row: each row reads the
/// current value and a successful row returns the map with its type bumped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCounters(BTreeMap<String, i64>);

impl AssetCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, asset_type: &str) -> Option<i64> {
        self.0.get(asset_type).copied()
    }

    pub fn set(&mut self, asset_type: impl Into<String>, next: i64) {
        self.0.insert(asset_type.into(), next);
    }

    /// Return the counters with `asset_type` advanced by one.
    ///
    /// Types without a counter are left alone.
    pub fn advanced(mut self, asset_type: &str) -> Self {
        if let Some(n) = self.0.get_mut(asset_type) {
            *n += 1;
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for AssetCounters {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_mark_parse_is_lenient() {
        assert_eq!(ProcessMark::parse(""), ProcessMark::New);
        assert_eq!(ProcessMark::parse("  Successful "), ProcessMark::Successful);
        assert_eq!(ProcessMark::parse("SKIP"), ProcessMark::Skip);
        assert_eq!(ProcessMark::parse("hold"), ProcessMark::Hold);
        assert_eq!(ProcessMark::parse("Failed"), ProcessMark::Failed);
        assert_eq!(ProcessMark::parse("retry please"), ProcessMark::New);
    }

    #[test]
    fn pending_marks() {
        assert!(ProcessMark::New.is_pending());
        assert!(ProcessMark::Failed.is_pending());
        assert!(!ProcessMark::Successful.is_pending());
        assert!(!ProcessMark::Skip.is_pending());
        assert!(!ProcessMark::Hold.is_pending());
    }

    #[test]
    fn counters_advance_only_known_type() {
        let counters: AssetCounters = [("Outfits".to_string(), 4)].into_iter().collect();
        let counters = counters.advanced("Outfits").advanced("Hats");
        assert_eq!(counters.get("Outfits"), Some(5));
        assert_eq!(counters.get("Hats"), None);
    }

    #[test]
    fn upload_row_uses_sheet_headers() {
        let json = r#"{"Image": "https://x/a.png", "Page": "Gallery", "Type": "Outfits",
                       "Asset Designer": "Ana", "Process": "Hold"}"#;
        let row: UploadRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.asset_type, "Outfits");
        assert_eq!(row.designer, "Ana");
        assert_eq!(row.layers, "");
        assert_eq!(row.mark(), ProcessMark::Hold);
    }
}
