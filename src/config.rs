//! Tool configuration module.
//!
//! Handles loading, validating, and merging `wikigal.toml`. Stock defaults
//! are overridden by whatever the user file sets; a missing file means the
//! stock defaults are used as-is.
//!
//! ## Keys and Defaults
//!
//! ```toml
//! workbook = "workbook.json"   # Upload/Content sheets (JSON)
//!
//! [images]
//! max_dimension = 1024         # Longest edge in pixels
//! max_bytes = 1048576          # PNG byte budget (1 MiB)
//! min_scale = 0.2              # Smallest cumulative shrink scale
//! scale_step = 0.1             # Shrink decrement per retry
//!
//! [wiki]
//! api_url = "https://gacha-designer.fandom.com/api.php"
//! user_agent = "wikigal/0.3"
//! timeout_secs = 60            # Per-request timeout for uploads and edits
//! edit_pause_secs = 2          # Pause after each successful row
//!
//! [fetch]
//! timeout_secs = 30            # Per-request timeout for image downloads
//! ```
//!
//! ## Sparse Files
//!
//! A file only needs the keys it changes:
//!
//! ```toml
//! [images]
//! max_bytes = 524288
//! ```
//!
//! A misspelled key is an error, not a silently ignored setting.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Contents of `wikigal.toml`, every key defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the workbook JSON file, relative to the working directory.
    pub workbook: String,
    /// Normalization limits for uploaded images.
    pub images: ImagesConfig,
    /// MediaWiki endpoint and pacing.
    pub wiki: WikiConfig,
    /// Image download settings.
    pub fetch: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workbook: "workbook.json".to_string(),
            images: ImagesConfig::default(),
            wiki: WikiConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Reject limits the normalizer or the client can't work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "images.max_dimension must be non-zero".into(),
            ));
        }
        if self.images.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "images.max_bytes must be non-zero".into(),
            ));
        }
        if !(self.images.min_scale > 0.0 && self.images.min_scale <= 1.0) {
            return Err(ConfigError::Validation(
                "images.min_scale must be in (0, 1]".into(),
            ));
        }
        if !(self.images.scale_step > 0.0 && self.images.scale_step < 1.0) {
            return Err(ConfigError::Validation(
                "images.scale_step must be in (0, 1)".into(),
            ));
        }
        if self.wiki.api_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "wiki.api_url must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Image normalization limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Longest edge in pixels after the fit.
    pub max_dimension: u32,
    /// Byte budget for the encoded PNG.
    pub max_bytes: usize,
    /// Smallest cumulative scale the shrink loop may reach.
    pub min_scale: f64,
    /// Decrement applied to the cumulative scale per shrink retry.
    pub scale_step: f64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            max_bytes: 1024 * 1024,
            min_scale: 0.2,
            scale_step: 0.1,
        }
    }
}

/// MediaWiki endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WikiConfig {
    /// Full URL of the wiki's `api.php`.
    pub api_url: String,
    /// `User-Agent` sent with every API request.
    pub user_agent: String,
    /// Per-request timeout for uploads and edits, in seconds.
    pub timeout_secs: u64,
    /// Pause after each successfully published row, in seconds.
    pub edit_pause_secs: u64,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://gacha-designer.fandom.com/api.php".to_string(),
            user_agent: concat!("wikigal/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 60,
            edit_pause_secs: 2,
        }
    }
}

/// Image download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Per-request timeout for image downloads, in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// [`Config::default`] as a TOML table: the layer user files merge onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Deep-merge `overlay` onto `base`.
///
/// Tables merge per key and recurse; any other overlay value replaces the
/// base value outright. Keys only present in `base` survive.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse a config file without applying defaults. `None` when the file is absent.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `path` over the stock defaults and validate.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Annotated `wikigal.toml` printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# wikigal Configuration
# =====================
# Every key is optional and shows its default here. Delete what you don't
# change; unrecognized keys are an error.
#
# Credentials are never read from this file: set WIKI_USERNAME and
# WIKI_PASSWORD (a bot password from Special:BotPasswords works best).

# Workbook with the "upload" and "content" sheets, as JSON.
workbook = "workbook.json"

# ---------------------------------------------------------------------------
# Image normalization
# ---------------------------------------------------------------------------
[images]
# Longest edge in pixels. Larger images are downscaled (never upscaled).
max_dimension = 1024

# PNG byte budget. Images over budget are shrunk step by step.
max_bytes = 1048576

# Smallest cumulative scale the shrink loop may reach. An image still over
# budget at this scale is uploaded anyway.
min_scale = 0.2

# Decrement applied to the cumulative scale per retry (1.0, 0.9, 0.8, ...).
scale_step = 0.1

# ---------------------------------------------------------------------------
# Wiki
# ---------------------------------------------------------------------------
[wiki]
# Full URL of the wiki's api.php.
api_url = "https://gacha-designer.fandom.com/api.php"

# User-Agent sent with every API request.
# user_agent = "wikigal/<version>"

# Per-request timeout for uploads and edits, in seconds.
timeout_secs = 60

# Pause after each successfully published row, in seconds.
edit_pause_secs = 2

# ---------------------------------------------------------------------------
# Image downloads
# ---------------------------------------------------------------------------
[fetch]
# Per-request timeout for image downloads, in seconds.
timeout_secs = 30
"##
}
