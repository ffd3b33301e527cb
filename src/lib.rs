//! # wikigal
//!
//! Publishes community-made images to a MediaWiki gallery. A workbook lists
//! one asset per row; for each pending row wikigal downloads the image,
//! normalizes it to a size-bounded PNG, uploads it, and appends a line to the
//! `<gallery>` under the asset type's heading on the target page.
//!
//! # Architecture: Pure Core, Traits at the Edges
//!
//! ```text
//! RowStore ──rows──▶ Publisher ──url──▶ ImageSource
//!                      │  normalize()      (pure)
//!                      │  insert_gallery_entry()  (pure)
//!                      ├──bytes──▶ MediaSink
//!                      └──text───▶ PageStore
//! ```
//!
//! The two pieces of real logic, the image normalizer and the gallery
//! patcher, are pure functions. Everything with side effects sits behind a
//! small trait, so the pipeline is tested against in-memory fakes and the
//! production wiring lives in `main`.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Decode, fit within 1024px, PNG-encode, shrink until under the byte budget |
//! | [`markup`] | Locate a section's `<gallery>` block and append one entry |
//! | [`pipeline`] | Sequential row processing and per-row failure reporting |
//! | [`naming`] | File names, captions, upload comments, edit summaries |
//! | [`sources`] | `ImageSource` trait and the HTTP implementation |
//! | [`wiki`] | `MediaSink` / `PageStore` traits and the MediaWiki Action API client |
//! | [`workbook`] | `RowStore` trait and the JSON workbook |
//! | [`config`] | `wikigal.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Rows, statuses, outcomes, and per-type counters |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Sequential Rows
//!
//! Numbers are handed out per asset type in sheet order, and each successful
//! row consumes one. Processing rows one at a time keeps numbering and the
//! page's gallery order identical to the sheet, and keeps the wiki's edit
//! rate low. A failed row does not consume its number.
//!
//! ## Never Lose a Gallery
//!
//! The patcher only replaces the inner content of one gallery block. The text
//! before the opening tag and after the closing tag is copied byte for byte,
//! and a page with no matching heading or gallery is left alone with an error.
//!
//! ## Best Effort Over Budget
//!
//! Shrinking stops at a minimum scale. If the PNG is still too large the
//! smallest attempt is returned, flagged `within_budget = false`, rather than
//! failing the row.

pub mod config;
pub mod imaging;
pub mod markup;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod types;
pub mod wiki;
pub mod workbook;

#[cfg(test)]
pub(crate) mod test_helpers;
