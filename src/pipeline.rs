//! Row pipeline: workbook row → fetched image → wiki upload → gallery edit.
//!
//! Rows are handled strictly one after another, in sheet order:
//!
//! ```text
//! for each row
//!   not pending?        → Skipped (nothing written)
//!   no counter for type → Failed "No number for type …"
//!   write Number cell
//!   fetch + normalize   → "Image error: …"
//!   upload              → "Upload error: …"   (one resend on a dropped connection)
//!   read, patch, save   → "Gallery error: …"
//!   Successful, counter + 1 written back, pause before the next row
//! ```
//!
//! A failed row never stops the run; its reason is written to the sheet and
//! the next row starts. Only a failure to write the sheet itself aborts.
//!
//! Counters are threaded through explicitly: [`Publisher::publish_row`] takes
//! the current [`AssetCounters`] and hands back the ones the next row sees.

use crate::imaging::{NormalizeError, NormalizeParams, normalize};
use crate::markup::{MarkupError, gallery_line, insert_gallery_entry};
use crate::naming::{asset_filename, caption, edit_summary, upload_description};
use crate::sources::{FetchError, ImageSource};
use crate::types::{AssetCounters, ProcessMark, RowOutcome, RowRecord, RowStatus};
use crate::wiki::{MediaSink, PageStore, UploadMeta, WikiError};
use crate::workbook::{RowStore, WorkbookError};
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Workbook error: {0}")]
    Workbook(#[from] WorkbookError),
}

/// Why a single row failed. The display text is what lands in the `Reason` column.
#[derive(Error, Debug)]
pub enum RowFailure {
    #[error("No number for type {0}")]
    NoNumber(String),
    #[error("Image error: {0}")]
    Fetch(#[from] FetchError),
    #[error("Image error: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("Upload error: {0}")]
    Upload(#[source] WikiError),
    #[error("Gallery error: {0}")]
    Page(#[source] WikiError),
    #[error("Gallery error: {0}")]
    Markup(#[from] MarkupError),
}

/// Result of one row, as reported to the caller and the progress printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReport {
    pub index: usize,
    pub asset_type: String,
    /// Set once a number was assigned.
    pub filename: Option<String>,
    pub outcome: RowOutcome,
}

/// Progress events sent while a run is underway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent {
    Started {
        index: usize,
        asset_type: String,
        image: String,
    },
    Finished(RowReport),
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Counters as they stood after the last row.
    pub counters: AssetCounters,
}

impl RunSummary {
    fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Successful => self.successful += 1,
            RowOutcome::Failed(_) => self.failed += 1,
            RowOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed + self.skipped
    }
}

/// Publishes workbook rows to the wiki through the collaborator traits.
pub struct Publisher<'a> {
    images: &'a dyn ImageSource,
    media: &'a dyn MediaSink,
    pages: &'a dyn PageStore,
    params: NormalizeParams,
    edit_pause: Duration,
}

impl<'a> Publisher<'a> {
    pub fn new(
        images: &'a dyn ImageSource,
        media: &'a dyn MediaSink,
        pages: &'a dyn PageStore,
        params: NormalizeParams,
    ) -> Self {
        Self {
            images,
            media,
            pages,
            params,
            edit_pause: Duration::ZERO,
        }
    }

    /// Wait this long after every successful row, to stay under wiki edit rate limits.
    pub fn with_edit_pause(mut self, pause: Duration) -> Self {
        self.edit_pause = pause;
        self
    }

    /// Process every row of the store in order.
    pub fn run(
        &self,
        store: &mut dyn RowStore,
        events: Option<Sender<RowEvent>>,
    ) -> Result<RunSummary, PipelineError> {
        let rows = store.read_rows()?;
        let mut counters = store.read_counters()?;
        let mut summary = RunSummary::default();
        info!(rows = rows.len(), types = counters.len(), "starting run");

        for record in &rows {
            if let Some(tx) = events.as_ref().filter(|_| record.is_pending()) {
                tx.send(RowEvent::Started {
                    index: record.index,
                    asset_type: record.row.asset_type.trim().to_string(),
                    image: record.row.image.clone(),
                })
                .ok();
            }

            let (report, next) = self.publish_row(record, counters, store)?;
            counters = next;
            summary.record(&report.outcome);

            let succeeded = report.outcome == RowOutcome::Successful;
            if let Some(tx) = &events {
                tx.send(RowEvent::Finished(report)).ok();
            }
            if succeeded && !self.edit_pause.is_zero() {
                std::thread::sleep(self.edit_pause);
            }
        }

        info!(
            successful = summary.successful,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );
        summary.counters = counters;
        Ok(summary)
    }

    /// Publish one row and write its result back to the store.
    ///
    /// Returns the report and the counters for the next row: advanced by one
    /// for this row's type on success, unchanged otherwise.
    pub fn publish_row(
        &self,
        record: &RowRecord,
        counters: AssetCounters,
        store: &mut dyn RowStore,
    ) -> Result<(RowReport, AssetCounters), PipelineError> {
        let row = &record.row;
        let asset_type = row.asset_type.trim().to_string();
        let mut report = RowReport {
            index: record.index,
            asset_type: asset_type.clone(),
            filename: None,
            outcome: RowOutcome::Skipped,
        };

        if !record.is_pending() {
            return Ok((report, counters));
        }

        let Some(number) = counters.get(&asset_type) else {
            let failure = RowFailure::NoNumber(asset_type);
            report.outcome = self.fail(record, failure, store)?;
            return Ok((report, counters));
        };

        store.write_row_number(record.index, number)?;
        let filename = asset_filename(&asset_type, number);
        report.filename = Some(filename.clone());
        info!(row = record.index, file = %filename, "publishing");

        match self.publish(record, &asset_type, &filename) {
            Ok(()) => {
                store.write_row_status(record.index, RowStatus::Successful, "")?;
                let counters = counters.advanced(&asset_type);
                if let Some(next) = counters.get(&asset_type) {
                    store.write_counter(&asset_type, next)?;
                }
                info!(row = record.index, file = %filename, "published");
                report.outcome = RowOutcome::Successful;
                Ok((report, counters))
            }
            Err(failure) => {
                report.outcome = self.fail(record, failure, store)?;
                Ok((report, counters))
            }
        }
    }

    fn fail(
        &self,
        record: &RowRecord,
        failure: RowFailure,
        store: &mut dyn RowStore,
    ) -> Result<RowOutcome, PipelineError> {
        let reason = failure.to_string();
        warn!(row = record.index, %reason, "row failed");
        store.write_row_status(record.index, RowStatus::Failed, &reason)?;
        Ok(RowOutcome::failed(reason))
    }

    fn publish(
        &self,
        record: &RowRecord,
        asset_type: &str,
        filename: &str,
    ) -> Result<(), RowFailure> {
        let row = &record.row;

        let raw = self.images.fetch(&row.image)?;
        let image = normalize(&raw, &self.params)?;
        info!(
            row = record.index,
            width = image.width,
            height = image.height,
            size = image.len(),
            "image normalized"
        );

        let meta = UploadMeta {
            comment: upload_description(&row.designer, &row.layers),
            ignore_warnings: row.mark() == ProcessMark::Failed,
        };
        self.upload(filename, &image.bytes, &meta)
            .map_err(RowFailure::Upload)?;

        let title = row.page.trim();
        let page = self.pages.read_page(title).map_err(RowFailure::Page)?;
        let line = gallery_line(filename, &caption(&row.designer));
        let patched = insert_gallery_entry(&page, asset_type, &line)?;
        self.pages
            .write_page(title, &patched, &edit_summary(filename))
            .map_err(RowFailure::Page)?;
        Ok(())
    }

    /// Upload, resending once if the connection dropped.
    fn upload(&self, filename: &str, bytes: &[u8], meta: &UploadMeta) -> Result<(), WikiError> {
        match self.media.upload(filename, bytes, meta) {
            Err(e) if e.is_connection() => {
                warn!(file = filename, error = %e, "connection dropped, resending upload");
                self.media.upload(filename, bytes, meta)
            }
            other => other,
        }
    }
}
