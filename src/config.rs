//! Converter configuration.
//!
//! Handles loading, validating, and merging `wikidump.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "html"           # "html" or "markdown"
//! stylesheet = "https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css"
//! footer = "Generated from MediaWiki dump."
//!
//! [images]
//! placeholder_base = "https://placehold.co"
//! default_width = 600       # Size of an embed without size options
//! default_height = 400
//! upright_scale = 0.37      # upright=1 width as a fraction of default_width
//! min_width = 40
//! max_width = 1600
//! min_height = 40
//! max_height = 1200
//! label_chars = 60          # Filename excerpt shown on the placeholder
//!
//! [parsing]
//! template_passes = 10      # Rounds of innermost {{template}} removal
//! key_value_ratio = 0.6     # Share of two-cell rows that makes an infobox
//!
//! [processing]
//! max_processes = 4         # Conversion threads (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = "wikidump.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `wikidump.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Output backend and shared document chrome.
    pub output: OutputConfig,
    /// File embed placeholder sizing.
    pub images: ImagesConfig,
    /// Parser heuristics.
    pub parsing: ParsingConfig,
    /// Parallel conversion settings.
    pub processing: ProcessingConfig,
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let images = &self.images;
        if images.min_width == 0 || images.min_height == 0 {
            return Err(ConfigError::Validation(
                "images.min_width and images.min_height must be non-zero".into(),
            ));
        }
        if images.min_width > images.max_width || images.min_height > images.max_height {
            return Err(ConfigError::Validation(
                "images minimum sizes must not exceed maximum sizes".into(),
            ));
        }
        if images.upright_scale <= 0.0 {
            return Err(ConfigError::Validation(
                "images.upright_scale must be positive".into(),
            ));
        }
        if images.label_chars == 0 {
            return Err(ConfigError::Validation(
                "images.label_chars must be non-zero".into(),
            ));
        }
        if images.placeholder_base.trim().is_empty() {
            return Err(ConfigError::Validation(
                "images.placeholder_base must not be empty".into(),
            ));
        }
        let ratio = self.parsing.key_value_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::Validation(
                "parsing.key_value_ratio must be in (0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Output backend and document chrome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Backend used when the CLI does not pick one.
    pub format: OutputFormat,
    /// Stylesheet linked from every HTML document.
    pub stylesheet: String,
    /// Footer line of every HTML document.
    pub footer: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Html,
            stylesheet: "https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css"
                .to_string(),
            footer: "Generated from MediaWiki dump.".to_string(),
        }
    }
}

/// Placeholder image settings for `[[File:…]]` embeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Placeholder service; images point at `<base>/<W>x<H>?text=<name>`.
    pub placeholder_base: String,
    /// Width of an embed without size options; also the `upright` base.
    pub default_width: u32,
    /// Height of an embed without size options.
    pub default_height: u32,
    /// Width of `upright=1` as a fraction of `default_width`.
    pub upright_scale: f64,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    /// Number of filename characters passed to the placeholder.
    pub label_chars: usize,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            placeholder_base: "https://placehold.co".to_string(),
            default_width: 600,
            default_height: 400,
            upright_scale: 0.37,
            min_width: 40,
            max_width: 1600,
            min_height: 40,
            max_height: 1200,
            label_chars: 60,
        }
    }
}

/// Tunable parser heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParsingConfig {
    /// Rounds of innermost `{{…}}` removal before block parsing.
    pub template_passes: usize,
    /// Minimum share of exactly-two-cell rows for the key-value table layout.
    pub key_value_ratio: f64,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            template_passes: 10,
            key_value_ratio: 0.6,
        }
    }
}

/// Parallel conversion settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of conversion threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
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

/// Load `wikidump.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `wikidump.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `wikidump.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# wikidump configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Backend used when --format is not given: "html" or "markdown".
format = "html"

# Stylesheet linked from every HTML document.
stylesheet = "https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css"

# Footer line of every HTML document.
footer = "Generated from MediaWiki dump."

# ---------------------------------------------------------------------------
# File embeds
# ---------------------------------------------------------------------------
[images]
# Embeds become placeholder images served from <base>/<W>x<H>?text=<name>.
placeholder_base = "https://placehold.co"

# Size of an embed that has no size option.
default_width = 600
default_height = 400

# Width of `upright` (factor 1) as a fraction of default_width.
upright_scale = 0.37

# Every placeholder is clamped into these bounds.
min_width = 40
max_width = 1600
min_height = 40
max_height = 1200

# Number of filename characters written onto the placeholder.
label_chars = 60

# ---------------------------------------------------------------------------
# Parsing heuristics
# ---------------------------------------------------------------------------
[parsing]
# Rounds of innermost {{template}} removal. Templates nested deeper than this
# stay in the output as literal text.
template_passes = 10

# A table renders as a key/value infobox when at least this share of its rows
# has exactly two cells.
key_value_ratio = 0.6

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel conversion threads.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
