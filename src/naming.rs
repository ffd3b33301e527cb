//! Naming conventions for published assets.
//!
//! Every asset is named after its type and the next free number for that
//! type, and carries a short attribution:
//!
//! - File name: `Outfits` + `12` → `Outfits12.png`
//! - Gallery caption: `Made by Ana`
//! - Upload comment: the caption, plus up to five numbered layer links
//!
//! ```text
//! Made by Ana
//!
//! **Layer Images:**
//! [1](https://example.com/base.png)
//! [2](https://example.com/hair.png)
//! ```

/// Layer links beyond this count are dropped from the upload comment.
pub const MAX_LAYER_LINKS: usize = 5;

/// File name for the `number`-th asset of `asset_type`.
pub fn asset_filename(asset_type: &str, number: i64) -> String {
    format!("{}{}.png", asset_type.trim(), number)
}

/// One-line attribution used as the gallery caption.
pub fn caption(designer: &str) -> String {
    format!("Made by {}", designer.trim())
}

/// Split a comma-separated `Layers` cell into links, dropping blanks.
pub fn parse_layer_links(layers: &str) -> Vec<&str> {
    layers
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Upload comment: caption plus numbered layer links, when any.
pub fn upload_description(designer: &str, layers: &str) -> String {
    let mut description = caption(designer);
    let links = parse_layer_links(layers);
    if !links.is_empty() {
        description.push_str("\n\n**Layer Images:**");
        for (i, link) in links.iter().take(MAX_LAYER_LINKS).enumerate() {
            description.push_str(&format!("\n[{}]({})", i + 1, link));
        }
    }
    description
}

/// Edit summary recorded on the gallery page.
pub fn edit_summary(filename: &str) -> String {
    format!("Added {filename} to gallery")
}
