//! CLI output formatting.
//!
//! Output is **row-centric**: every line leads with the row's positional
//! index in the upload sheet and its asset type, so the printout reads like
//! the sheet itself.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! 001 Outfits https://example.com/a.png
//!     Outfits12.png: published
//! 002 Outfits (skipped)
//! 003 Hats https://example.com/c.png
//!     Hats3.png: failed
//!     Reason: Upload error: The file is a duplicate
//!
//! Published 1, failed 1, skipped 1
//! Next numbers: Hats 3, Outfits 13
//! ```
//!
//! ## Status
//!
//! ```text
//! 001 Outfits pending
//!     Image: https://example.com/a.png
//!     Page: Outfit Gallery
//! 002 Outfits Successful (Outfits12)
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::imaging::NormalizedImage;
use crate::pipeline::{RowEvent, RowReport, RunSummary};
use crate::types::{AssetCounters, RowOutcome, RowRecord};

/// Format a 0-based sheet position as a 1-based, 3-digit index.
fn format_index(index: usize) -> String {
    format!("{:0>3}", index + 1)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// Run output
// ============================================================================

/// Format one progress event.
pub fn format_row_event(event: &RowEvent) -> Vec<String> {
    match event {
        RowEvent::Started {
            index,
            asset_type,
            image,
        } => vec![format!("{} {} {}", format_index(*index), asset_type, image)],
        RowEvent::Finished(report) => format_row_report(report),
    }
}

/// Format the result of one row.
///
/// Skipped rows get a single header line since no `Started` line precedes them.
pub fn format_row_report(report: &RowReport) -> Vec<String> {
    let RowReport {
        index,
        asset_type,
        filename,
        outcome,
    } = report;
    let label = filename.as_deref().unwrap_or(asset_type.as_str());

    match outcome {
        RowOutcome::Skipped => {
            vec![format!("{} {} (skipped)", format_index(*index), asset_type)]
        }
        RowOutcome::Successful => vec![format!("{}{}: published", indent(1), label)],
        RowOutcome::Failed(reason) => vec![
            format!("{}{}: failed", indent(1), label),
            format!("{}Reason: {}", indent(1), reason),
        ],
    }
}

/// Format the totals printed after a run.
pub fn format_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Published {}, failed {}, skipped {}",
            summary.successful, summary.failed, summary.skipped
        ),
    ];
    if !summary.counters.is_empty() {
        lines.push(format!("Next numbers: {}", format_counters(&summary.counters)));
    }
    lines
}

fn format_counters(counters: &AssetCounters) -> String {
    counters
        .iter()
        .map(|(t, n)| format!("{t} {n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print the totals after a run.
pub fn print_summary(summary: &RunSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Status output
// ============================================================================

/// Format the upload sheet: pending rows with their source and page,
/// finished rows with their status and assigned file.
pub fn format_status(rows: &[RowRecord], counters: &AssetCounters) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending = 0;

    for record in rows {
        let row = &record.row;
        let asset_type = row.asset_type.trim();
        if record.is_pending() {
            pending += 1;
            let state = if row.process.trim().is_empty() {
                "pending".to_string()
            } else {
                format!("pending (was {})", row.process.trim())
            };
            lines.push(format!("{} {} {}", format_index(record.index), asset_type, state));
            lines.push(format!("{}Image: {}", indent(1), row.image.trim()));
            lines.push(format!("{}Page: {}", indent(1), row.page.trim()));
            if !row.reason.trim().is_empty() {
                lines.push(format!("{}Reason: {}", indent(1), row.reason.trim()));
            }
        } else {
            let number = row.number.trim();
            let line = if number.is_empty() {
                format!("{} {} {}", format_index(record.index), asset_type, row.process.trim())
            } else {
                format!(
                    "{} {} {} ({}{})",
                    format_index(record.index),
                    asset_type,
                    row.process.trim(),
                    asset_type,
                    number
                )
            };
            lines.push(line);
        }
    }

    lines.push(String::new());
    lines.push(format!("{} of {} rows pending", pending, rows.len()));
    if !counters.is_empty() {
        lines.push(format!("Next numbers: {}", format_counters(counters)));
    }
    lines
}

/// Print the upload sheet status.
pub fn print_status(rows: &[RowRecord], counters: &AssetCounters) {
    for line in format_status(rows, counters) {
        println!("{}", line);
    }
}

// ============================================================================
// Tool output
// ============================================================================

/// Format the result of a local `normalize` run.
pub fn format_normalized(output: &str, image: &NormalizedImage, max_bytes: usize) -> Vec<String> {
    let mut lines = vec![
        format!("{} \u{2192} {}x{}", output, image.width, image.height),
        format!("{}Size: {} bytes", indent(1), image.len()),
        format!("{}Scale: {:.2}", indent(1), image.scale),
    ];
    if !image.within_budget {
        lines.push(format!(
            "{}Warning: still over the {} byte budget",
            indent(1),
            max_bytes
        ));
    }
    lines
}

pub fn print_normalized(output: &str, image: &NormalizedImage, max_bytes: usize) {
    for line in format_normalized(output, image, max_bytes) {
        println!("{}", line);
    }
}
