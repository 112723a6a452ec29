//! Gallery configuration.
//!
//! Handles loading, validating, and merging the optional `image-archive.toml`
//! file. Stock defaults are the base layer; a user file only needs the keys it
//! wants to override. Command-line flags are applied on top by the binary.
//!
//! ## Config File Location
//!
//! ```text
//! photos/
//! ├── image-archive.toml   # Optional, read from the gallery root
//! ├── 2023/
//! │   └── ...
//! └── holiday.jpg
//! ```
//!
//! A different file can be passed with `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! [thumbnails]
//! enabled = true
//! dir_name = ".thumbs"      # Reserved subdirectory, never indexed or watched
//! width = 150
//! height = 150
//! quality = 80              # JPEG quality for .jpg/.jpeg thumbnails
//!
//! [index]
//! filename = "index.html"
//! overview_filename = "gallery.html"
//! title = "Image Gallery"   # Title of the overview document
//!
//! [watch]
//! queue_capacity = 100
//! exclude = []              # Extra base-name glob patterns
//! backend = "native"        # or "poll"
//! poll_interval_ms = 2000
//!
//! [processing]
//! max_processes = 4         # Omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the gallery root.
pub const CONFIG_FILENAME: &str = "image-archive.toml";

/// Queue capacity applied when the configured one is zero.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `image-archive.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Thumbnail generation settings.
    pub thumbnails: ThumbnailsConfig,
    /// Generated document names.
    pub index: IndexConfig,
    /// Watch mode settings.
    pub watch: WatchConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.width == 0 || self.thumbnails.height == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.width and thumbnails.height must be non-zero".into(),
            ));
        }
        if self.thumbnails.quality == 0 || self.thumbnails.quality > 100 {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        for (key, name) in [
            ("thumbnails.dir_name", &self.thumbnails.dir_name),
            ("index.filename", &self.index.filename),
            ("index.overview_filename", &self.index.overview_filename),
        ] {
            if !is_plain_file_name(name) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a single path segment, got {name:?}"
                )));
            }
        }
        if self.index.filename == self.index.overview_filename {
            return Err(ConfigError::Validation(
                "index.filename and index.overview_filename must differ".into(),
            ));
        }
        for pattern in &self.watch.exclude {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Validation(format!("watch.exclude pattern {pattern:?}: {e}"))
            })?;
        }
        if self.watch.backend == WatchBackend::Poll && self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "watch.poll_interval_ms must be non-zero with the poll backend".into(),
            ));
        }
        Ok(())
    }

    /// The per-run layout threaded through scanning, thumbnailing and rendering.
    pub fn layout(&self) -> Layout {
        Layout {
            thumbnails_enabled: self.thumbnails.enabled,
            thumb_dir: self.thumbnails.dir_name.clone(),
            index_file: self.index.filename.clone(),
            thumb_width: self.thumbnails.width,
            thumb_height: self.thumbnails.height,
            thumb_quality: self.thumbnails.quality as u8,
        }
    }

    /// Base-name patterns the watcher must ignore: every generated artifact
    /// plus the user's extra patterns.
    pub fn watch_exclusions(&self) -> Vec<String> {
        let mut patterns = vec![
            self.index.filename.clone(),
            self.thumbnails.dir_name.clone(),
            self.index.overview_filename.clone(),
        ];
        patterns.extend(self.watch.exclude.iter().cloned());
        patterns
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Generate thumbnails and link them from index documents.
    pub enabled: bool,
    /// Reserved subdirectory holding thumbnails, one per visited directory.
    pub dir_name: String,
    /// Target box width. Sources are scaled into it without preserving aspect.
    pub width: u32,
    /// Target box height.
    pub height: u32,
    /// JPEG quality (1-100).
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir_name: ".thumbs".to_string(),
            width: 150,
            height: 150,
            quality: 80,
        }
    }
}

/// Generated document names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// Per-directory index document.
    pub filename: String,
    /// Single-page overview written to the gallery root with `--overview`.
    pub overview_filename: String,
    /// Title of the overview document.
    pub title: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            filename: "index.html".to_string(),
            overview_filename: "gallery.html".to_string(),
            title: "Image Gallery".to_string(),
        }
    }
}

/// Which notification mechanism the watcher uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchBackend {
    /// inotify / FSEvents / ReadDirectoryChangesW.
    #[default]
    Native,
    /// Periodic rescans, for network or FUSE filesystems.
    Poll,
}

/// Watch mode settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    /// Capacity of the event queue between watcher and dispatcher.
    /// Zero means [`DEFAULT_QUEUE_CAPACITY`].
    pub queue_capacity: usize,
    /// Extra glob patterns matched against the base name of each path.
    pub exclude: Vec<String>,
    pub backend: WatchBackend,
    /// Rescan interval for the poll backend.
    pub poll_interval_ms: u64,
}

impl WatchConfig {
    pub fn effective_capacity(&self) -> usize {
        if self.queue_capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            self.queue_capacity
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            exclude: Vec::new(),
            backend: WatchBackend::Native,
            poll_interval_ms: 2000,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel thumbnail workers.
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

/// Everything a single directory visit needs to know about the run.
///
/// Replaces ambient switches: the thumbnail toggle and the reserved names
/// travel explicitly from the config to every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub thumbnails_enabled: bool,
    pub thumb_dir: String,
    pub index_file: String,
    pub thumb_width: u32,
    pub thumb_height: u32,
    pub thumb_quality: u8,
}

impl Default for Layout {
    fn default() -> Self {
        GalleryConfig::default().layout()
    }
}

impl Layout {
    /// Same layout with thumbnailing switched off.
    pub fn without_thumbnails(mut self) -> Self {
        self.thumbnails_enabled = false;
        self
    }

    /// Whether `name` is the reserved thumbnail directory.
    pub fn is_thumb_dir(&self, name: &str) -> bool {
        name == self.thumb_dir
    }
}

// =============================================================================
// Config loading and merging
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(GalleryConfig::default())?)
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

/// Read a config file as a raw TOML value. `Ok(None)` if it does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<GalleryConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: GalleryConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `image-archive.toml` in the gallery root.
pub fn load_config(root: &Path) -> Result<GalleryConfig, ConfigError> {
    load_config_file(&root.join(CONFIG_FILENAME))
}

/// Load config from an explicit file path (stock defaults if it does not exist).
pub fn load_config_file(path: &Path) -> Result<GalleryConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `--gen-config` flag.
pub fn stock_config_toml() -> &'static str {
    r##"# image-archive configuration
# ===========================
# All settings are optional. Values shown below are the defaults.
# Place this file at <gallery root>/image-archive.toml or pass --config.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Same as passing --no-thumbs when false.
enabled = true

# Reserved subdirectory created next to the images of every directory.
# It is never listed, descended into, or watched.
dir_name = ".thumbs"

# Target box. Images are scaled to exactly this size (aspect is not kept).
width = 150
height = 150

# JPEG quality for .jpg/.jpeg thumbnails (PNG and GIF are lossless).
quality = 80

# ---------------------------------------------------------------------------
# Generated documents
# ---------------------------------------------------------------------------
[index]
filename = "index.html"

# Single-page overview of the whole tree, written with --overview.
overview_filename = "gallery.html"
title = "Image Gallery"

# ---------------------------------------------------------------------------
# Watch mode (--watch)
# ---------------------------------------------------------------------------
[watch]
# Events waiting for the dispatcher. The watcher blocks when it is full.
queue_capacity = 100

# Extra glob patterns matched against the last path segment only,
# e.g. ["*.tmp", ".DS_Store"]. Generated files are always excluded.
exclude = []

# "native" uses OS notifications; "poll" rescans every poll_interval_ms.
backend = "native"
poll_interval_ms = 2000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel thumbnail workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
