//! Configuration module.
//!
//! Handles loading, validating, and merging `imagecraft.toml`. Stock defaults
//! are the base layer; a user file overrides only the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! format = "jpeg"                # jpeg, png, webp, tiff, bmp, gif, ico
//! quality = 95                   # 1-100, honored by JPEG
//! background = [255, 255, 255]   # flatten color for alpha-less formats
//! # max_size_kb = 200            # byte budget, omit for none
//! budget = "single-retry"        # or "bisect"
//!
//! [processing]
//! max_processes = 4              # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Background, BudgetStrategy, EncodeSpec, OutputFormat, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "imagecraft.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `imagecraft.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CraftConfig {
    /// Encode defaults for every command that writes an image.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl CraftConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.output.max_size_kb == Some(0) {
            return Err(ConfigError::Validation(
                "output.max_size_kb must be positive".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The encode settings this config describes.
    pub fn encode_spec(&self) -> EncodeSpec {
        let output = &self.output;
        EncodeSpec::new(output.format)
            .with_quality(Quality::new(output.quality))
            .with_background(output.background)
            .with_max_size(output.max_size_kb.map(|kb| kb * 1024))
            .with_budget(output.budget)
    }
}

/// Encode defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub quality: u32,
    pub background: Background,
    /// Byte budget in KiB. Absent means no budget.
    pub max_size_kb: Option<u64>,
    pub budget: BudgetStrategy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 95,
            background: Background::WHITE,
            max_size_kb: None,
            budget: BudgetStrategy::SingleRetry,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
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
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(CraftConfig::default())?)
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

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CraftConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CraftConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, or stock defaults if the file is missing.
pub fn load_config(path: &Path) -> Result<CraftConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Load an explicitly requested file; unlike [`load_config`], a missing
/// file is an error.
pub fn load_required_config(path: &Path) -> Result<CraftConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("config file not found: {}", path.display()),
        )));
    }
    load_config(path)
}

/// Returns a fully-commented stock `imagecraft.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# imagecraft configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[output]
# Target format: jpeg, png, webp, tiff, bmp, gif, ico.
format = "jpeg"

# Encoding quality (1 = worst, 100 = best). Only JPEG honors it.
quality = 95

# RGB color transparent pixels are composited onto for formats
# without an alpha channel (JPEG, BMP).
background = [255, 255, 255]

# Byte budget in KiB. When the first encode is larger, quality is lowered.
# max_size_kb = 200

# How to lower quality when over budget:
#   "single-retry" - one re-encode at quality * budget / size (may overshoot)
#   "bisect"       - search for the highest quality that fits
budget = "single-retry"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `batch`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
