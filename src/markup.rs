//! Wikitext gallery patching.
//!
//! Pages that collect assets are laid out as one section per asset type,
//! each holding a `<gallery>` block:
//!
//! ```text
//! == Outfits ==
//! Some intro text.
//! <gallery>
//! File:Outfits1.png|Made by Ana
//! File:Outfits2.png|Made by Bo
//! </gallery>
//!
//! == Hats ==
//! <gallery>
//! </gallery>
//! ```
//!
//! [`insert_gallery_entry`] appends one line to the gallery of a named
//! section. It only rewrites the inner content of that one block: every byte
//! up to and including the opening tag, and from the closing tag on, is
//! copied through untouched.
//!
//! ## Matching Rules
//!
//! - **Heading**: the label between runs of two or more `=`, compared
//!   case-insensitively. The first match in the document wins.
//! - **Gallery**: the first `<gallery …>…</gallery>` after that heading and
//!   before the next heading. A gallery that belongs to a later section is
//!   never used.
//! - **Entries**: the existing content is trimmed and the new line is
//!   appended last. Nothing is reordered, deduplicated or validated, so
//!   inserting the same line twice yields two entries.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Missing =={0}== heading")]
    SectionNotFound(String),
    #[error("No <gallery> found under heading {0}")]
    GalleryNotFound(String),
    #[error("Section label can't be matched: {0}")]
    InvalidLabel(#[from] regex::Error),
}

/// Any section heading that starts a line, used to bound the gallery search.
///
/// The label may contain `=`, the heading may be followed by `<!-- -->`
/// comments, and the line may end in CRLF.
static NEXT_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*={2,}[^\r\n]*?[^=\r\n][^\r\n]*?={2,}[ \t]*(?:<!--[^\r\n]*?-->[ \t]*)*\r?$",
    )
    .expect("valid heading pattern")
});

/// A gallery block, opening tag attributes allowed. Group 1 is the inner content.
static GALLERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<gallery(?:\s[^>]*)?>(.*?)</gallery\s*>").expect("valid gallery pattern")
});

/// Byte spans of a gallery block located under a section heading.
///
/// Only valid for the text it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryRegion {
    pub heading: Range<usize>,
    pub open_tag: Range<usize>,
    pub inner: Range<usize>,
    pub close_tag: Range<usize>,
}

/// Find the first heading whose label matches `section_label`.
pub fn find_section_heading(
    page: &str,
    section_label: &str,
) -> Result<Option<Range<usize>>, MarkupError> {
    let pattern = format!(
        r"(?i)={{2,}}[ \t]*{}[ \t]*={{2,}}",
        regex::escape(section_label.trim())
    );
    let re = Regex::new(&pattern)?;
    Ok(re.find(page).map(|m| m.range()))
}

/// Locate the gallery block belonging to `section_label`.
pub fn locate_gallery(page: &str, section_label: &str) -> Result<GalleryRegion, MarkupError> {
    let heading = find_section_heading(page, section_label)?
        .ok_or_else(|| MarkupError::SectionNotFound(section_label.to_string()))?;

    let search_start = heading.end;
    let search_end = NEXT_HEADING
        .find_at(page, search_start)
        .map(|m| m.start())
        .unwrap_or(page.len());
    let window = &page[search_start..search_end];

    let caps = GALLERY
        .captures(window)
        .ok_or_else(|| MarkupError::GalleryNotFound(section_label.to_string()))?;
    let (Some(block), Some(inner)) = (caps.get(0), caps.get(1)) else {
        return Err(MarkupError::GalleryNotFound(section_label.to_string()));
    };

    let offset = |r: Range<usize>| (r.start + search_start)..(r.end + search_start);
    Ok(GalleryRegion {
        heading,
        open_tag: offset(block.start()..inner.start()),
        inner: offset(inner.range()),
        close_tag: offset(inner.end()..block.end()),
    })
}

/// Append `new_line` to the gallery under `section_label`.
///
/// Leading and trailing line breaks on `new_line` are dropped so callers may
/// pass either `"File:A.png|x"` or `"\nFile:A.png|x"`. The patched gallery
/// content always sits on its own lines between the tags, using CRLF when
/// the page already does.
pub fn insert_gallery_entry(
    page: &str,
    section_label: &str,
    new_line: &str,
) -> Result<String, MarkupError> {
    let region = locate_gallery(page, section_label)?;
    let existing = page[region.inner.clone()].trim();
    let entry = new_line.trim_matches(['\r', '\n']);
    let eol = if page.contains("\r\n") { "\r\n" } else { "\n" };

    let mut out = String::with_capacity(page.len() + entry.len() + 2 * eol.len());
    out.push_str(&page[..region.inner.start]);
    out.push_str(eol);
    if !existing.is_empty() {
        out.push_str(existing);
        out.push_str(eol);
    }
    out.push_str(entry);
    out.push_str(eol);
    out.push_str(&page[region.inner.end..]);
    Ok(out)
}

/// Format a gallery line for an uploaded file.
pub fn gallery_line(filename: &str, caption: &str) -> String {
    format!("File:{filename}|{caption}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTFITS_PAGE: &str = "== Outfits ==\n<gallery>\nFile:A.png|first\n</gallery>";

    #[test]
    fn appends_after_existing_entry() {
        let out = insert_gallery_entry(OUTFITS_PAGE, "Outfits", "\nFile:B.png|second").unwrap();
        assert_eq!(
            out,
            "== Outfits ==\n<gallery>\nFile:A.png|first\nFile:B.png|second\n</gallery>"
        );
    }

    #[test]
    fn leading_newline_on_entry_is_optional() {
        let with = insert_gallery_entry(OUTFITS_PAGE, "Outfits", "\nFile:B.png|second").unwrap();
        let without = insert_gallery_entry(OUTFITS_PAGE, "Outfits", "File:B.png|second").unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn empty_gallery_gets_single_entry() {
        let page = "== Hats ==\n<gallery></gallery>\n";
        let out = insert_gallery_entry(page, "Hats", "File:Hats1.png|x").unwrap();
        assert_eq!(out, "== Hats ==\n<gallery>\nFile:Hats1.png|x\n</gallery>\n");
    }

    #[test]
    fn whitespace_only_gallery_gets_single_entry() {
        let page = "== Hats ==\n<gallery>\n\n   \n</gallery>";
        let out = insert_gallery_entry(page, "Hats", "File:Hats1.png|x").unwrap();
        assert_eq!(out, "== Hats ==\n<gallery>\nFile:Hats1.png|x\n</gallery>");
    }

    #[test]
    fn label_is_case_insensitive() {
        let out = insert_gallery_entry(OUTFITS_PAGE, "OUTFITS", "File:B.png|b").unwrap();
        assert!(out.contains("File:B.png|b"));
    }

    #[test]
    fn deeper_heading_levels_match() {
        let page = "=== outfits ===\n<gallery>\n</gallery>";
        assert!(insert_gallery_entry(page, "Outfits", "File:B.png|b").is_ok());
    }

    #[test]
    fn marker_counts_are_independent() {
        let page = "==Outfits===\n<gallery>\n</gallery>";
        assert!(insert_gallery_entry(page, "Outfits", "File:B.png|b").is_ok());
    }

    #[test]
    fn single_marker_is_not_a_heading() {
        let page = "=Outfits=\n<gallery>\n</gallery>";
        let err = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap_err();
        assert!(matches!(err, MarkupError::SectionNotFound(_)));
    }

    #[test]
    fn label_prefix_does_not_match_longer_label() {
        let page = "== Outfits Extra ==\n<gallery>\n</gallery>";
        let err = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap_err();
        assert!(matches!(err, MarkupError::SectionNotFound(_)));
    }

    #[test]
    fn label_with_regex_metacharacters() {
        let page = "== Hats (rare) ==\n<gallery>\n</gallery>";
        let out = insert_gallery_entry(page, "Hats (rare)", "File:H.png|h").unwrap();
        assert!(out.contains("File:H.png|h"));
    }

    #[test]
    fn missing_section_is_reported() {
        let err = insert_gallery_entry(OUTFITS_PAGE, "Shoes", "File:S.png|s").unwrap_err();
        assert!(matches!(err, MarkupError::SectionNotFound(ref l) if l == "Shoes"));
        assert_eq!(err.to_string(), "Missing ==Shoes== heading");
    }

    #[test]
    fn missing_gallery_is_reported() {
        let page = "== Outfits ==\nNo gallery yet.\n";
        let err = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap_err();
        assert!(matches!(err, MarkupError::GalleryNotFound(_)));
    }

    #[test]
    fn gallery_of_later_section_is_not_used() {
        let page = "== Outfits ==\nNothing here.\n== Hats ==\n<gallery>\nFile:H.png|h\n</gallery>";
        let err = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap_err();
        assert!(matches!(err, MarkupError::GalleryNotFound(_)));
    }

    #[test]
    fn crlf_heading_bounds_the_search() {
        let page = "== Outfits ==\r\nnothing yet\r\n== Hats ==\r\n<gallery>\r\nFile:H.png|h\r\n</gallery>\r\n";
        let err = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap_err();
        assert!(matches!(err, MarkupError::GalleryNotFound(_)));
    }

    #[test]
    fn heading_with_equals_in_label_bounds_the_search() {
        let page = "== Outfits ==\nnothing yet\n== a=b ==\n<gallery>\nFile:H.png|h\n</gallery>\n";
        let err = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap_err();
        assert!(matches!(err, MarkupError::GalleryNotFound(_)));
    }

    #[test]
    fn heading_with_trailing_comment_bounds_the_search() {
        let page = "== Outfits ==\nnothing yet\n== Hats == <!-- keep sorted -->\n<gallery>\nFile:H.png|h\n</gallery>\n";
        let err = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap_err();
        assert!(matches!(err, MarkupError::GalleryNotFound(_)));
    }

    #[test]
    fn crlf_page_keeps_crlf_line_endings() {
        let page = "== Outfits ==\r\n<gallery>\r\nFile:A.png|a\r\n</gallery>\r\n== Hats ==\r\n<gallery>\r\n</gallery>\r\n";
        let out = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap();
        assert_eq!(
            out,
            "== Outfits ==\r\n<gallery>\r\nFile:A.png|a\r\nFile:B.png|b\r\n</gallery>\r\n== Hats ==\r\n<gallery>\r\n</gallery>\r\n"
        );
    }

    #[test]
    fn gallery_before_heading_is_ignored() {
        let page = "<gallery>\nFile:Top.png|top\n</gallery>\n== Outfits ==\n<gallery>\n</gallery>";
        let out = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap();
        assert_eq!(
            out,
            "<gallery>\nFile:Top.png|top\n</gallery>\n== Outfits ==\n<gallery>\nFile:B.png|b\n</gallery>"
        );
    }

    #[test]
    fn first_of_duplicate_sections_wins() {
        let page = "== Outfits ==\n<gallery>\n</gallery>\n== Outfits ==\n<gallery>\n</gallery>";
        let out = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap();
        assert_eq!(
            out,
            "== Outfits ==\n<gallery>\nFile:B.png|b\n</gallery>\n== Outfits ==\n<gallery>\n</gallery>"
        );
    }

    #[test]
    fn gallery_attributes_are_preserved() {
        let page = "== Outfits ==\n<gallery mode=\"packed\" widths=\"120\">\nFile:A.png|a\n</gallery>";
        let out = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap();
        assert_eq!(
            out,
            "== Outfits ==\n<gallery mode=\"packed\" widths=\"120\">\nFile:A.png|a\nFile:B.png|b\n</gallery>"
        );
    }

    #[test]
    fn surrounding_text_is_untouched() {
        let page = "Intro\n\n== Outfits ==\nText before.\n<gallery>\nFile:A.png|a\n</gallery>\nText after.\n[[Category:Assets]]";
        let region = locate_gallery(page, "Outfits").unwrap();
        let out = insert_gallery_entry(page, "Outfits", "File:B.png|b").unwrap();

        assert!(out.starts_with(&page[..region.open_tag.end]));
        assert!(out.ends_with(&page[region.close_tag.start..]));
    }

    #[test]
    fn duplicate_inserts_are_kept() {
        let once = insert_gallery_entry(OUTFITS_PAGE, "Outfits", "File:B.png|b").unwrap();
        let twice = insert_gallery_entry(&once, "Outfits", "File:B.png|b").unwrap();
        assert_eq!(twice.matches("File:B.png|b").count(), 2);
    }

    #[test]
    fn region_spans_point_at_tags() {
        let region = locate_gallery(OUTFITS_PAGE, "Outfits").unwrap();
        assert_eq!(&OUTFITS_PAGE[region.heading.clone()], "== Outfits ==");
        assert_eq!(&OUTFITS_PAGE[region.open_tag.clone()], "<gallery>");
        assert_eq!(&OUTFITS_PAGE[region.inner.clone()], "\nFile:A.png|first\n");
        assert_eq!(&OUTFITS_PAGE[region.close_tag.clone()], "</gallery>");
    }

    #[test]
    fn gallery_line_format() {
        assert_eq!(
            gallery_line("Outfits12.png", "Made by Ana"),
            "File:Outfits12.png|Made by Ana"
        );
    }
}
