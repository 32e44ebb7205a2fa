//! Configuration loading and parsing.
//!
//! Parses `vantage.toml` (or an override path provided by the binary). Every
//! table and key is optional; missing values take defaults and unknown keys
//! are ignored so older files keep loading. A file that fails to parse is
//! logged and replaced by defaults rather than aborting startup.
//!
//! ```toml
//! [calendar]
//! year = 2026
//!
//! [gesture]
//! click_tolerance_px = 5.0
//!
//! [layout]
//! max_event_fraction = 0.75
//! fallback_color = "gray"
//!
//! [store]
//! path = "/home/me/.local/share/vantage/store.json"
//! user = "me"
//!
//! [log]
//! filter = "info,state=debug"
//! ```
//!
//! The layout fraction is clamped twice: once to `0.1..=0.95` at parse time
//! and once more against the current cell width in [`Config::apply_context`],
//! so a narrow cell still keeps one column for events and one empty column for
//! starting a drag. The raw parsed value is retained so a resize can re-clamp.

use anyhow::Result;
use core_model::ColorToken;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "vantage.toml";
pub const MIN_EVENT_FRACTION: f32 = 0.1;
pub const MAX_EVENT_FRACTION: f32 = 0.95;

/// Terminal geometry the effective settings depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    pub viewport_columns: u16,
    pub viewport_rows: u16,
    /// Width of one day cell in columns, as laid out for the viewport.
    pub cell_columns: u16,
}

impl ConfigContext {
    pub fn new(viewport_columns: u16, viewport_rows: u16, cell_columns: u16) -> Self {
        Self {
            viewport_columns,
            viewport_rows,
            cell_columns,
        }
    }

    pub fn from_cell_columns(cell_columns: u16) -> Self {
        Self::new(0, 0, cell_columns)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CalendarConfig {
    /// Year shown at startup; the current local year when absent.
    #[serde(default)]
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GestureConfig {
    #[serde(default = "GestureConfig::default_click_tolerance")]
    pub click_tolerance_px: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            click_tolerance_px: Self::default_click_tolerance(),
        }
    }
}

impl GestureConfig {
    const fn default_click_tolerance() -> f32 {
        5.0
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    #[serde(default = "LayoutConfig::default_fraction")]
    pub max_event_fraction: f32,
    #[serde(default = "LayoutConfig::default_fallback")]
    pub fallback_color: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_event_fraction: Self::default_fraction(),
            fallback_color: Self::default_fallback(),
        }
    }
}

impl LayoutConfig {
    const fn default_fraction() -> f32 {
        0.75
    }
    fn default_fallback() -> String {
        ColorToken::FALLBACK.as_str().to_string()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "StoreConfig::default_user")]
    pub user: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            user: Self::default_user(),
        }
    }
}

impl StoreConfig {
    fn default_user() -> String {
        "local".to_string()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: Self::default_filter(),
        }
    }
}

impl LogConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub raw: Option<String>,           // original file string (optional)
    pub file: ConfigFile,              // parsed (or default) data
    pub effective_event_fraction: f32, // clamped to cell width
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(None, ConfigFile::default())
    }
}

/// Best-effort config path: `./vantage.toml`, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("vantage").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config::from_file(Some(content), file))
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

fn clamp_fraction(raw: f32) -> f32 {
    if raw.is_nan() {
        LayoutConfig::default_fraction()
    } else {
        raw.clamp(MIN_EVENT_FRACTION, MAX_EVENT_FRACTION)
    }
}

impl Config {
    fn from_file(raw: Option<String>, file: ConfigFile) -> Self {
        let effective_event_fraction = clamp_fraction(file.layout.max_event_fraction);
        Self {
            raw,
            file,
            effective_event_fraction,
        }
    }

    /// Click tolerance in pixels; negative or non-numeric values become 0.
    pub fn click_tolerance(&self) -> f32 {
        let raw = self.file.gesture.click_tolerance_px;
        if raw.is_nan() { 0.0 } else { raw.max(0.0) }
    }

    /// Neutral color for events whose category is gone. Unknown names fall
    /// back to the palette default.
    pub fn fallback_color(&self) -> ColorToken {
        let name = &self.file.layout.fallback_color;
        name.parse().unwrap_or_else(|_| {
            warn!(target: "config", name = %name, "unknown_fallback_color");
            ColorToken::FALLBACK
        })
    }

    /// `[store] path`, else `<data_dir>/vantage/store.json`.
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.file.store.path {
            return path.clone();
        }
        dirs::data_dir()
            .map(|dir| dir.join("vantage"))
            .unwrap_or_default()
            .join("store.json")
    }

    pub fn user(&self) -> &str {
        &self.file.store.user
    }

    pub fn log_filter(&self) -> &str {
        &self.file.log.filter
    }

    /// Clamp the layout fraction against the current cell width. Returns the
    /// effective value.
    ///
    /// With `w` columns per cell the event region must leave at least one
    /// empty column (`f <= (w - 1) / w`) and, when there are two or more
    /// columns, hold at least one event column (`f >= 1 / w`).
    pub fn apply_context(&mut self, ctx: ConfigContext) -> f32 {
        let raw = self.file.layout.max_event_fraction;
        let base = clamp_fraction(raw);
        let width = f32::from(ctx.cell_columns);
        let clamped = if ctx.cell_columns < 2 {
            base
        } else {
            let max = (width - 1.0) / width;
            let min = 1.0 / width;
            base.min(max).max(min)
        };

        if clamped != raw {
            info!(
                target: "config",
                raw,
                clamped,
                cell_columns = ctx.cell_columns,
                viewport_columns = ctx.viewport_columns,
                viewport_rows = ctx.viewport_rows,
                "max_event_fraction_clamped"
            );
        }
        self.effective_event_fraction = clamped;
        clamped
    }

    /// Recompute after a resize. Returns `Some(new_fraction)` when the
    /// effective value changed.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<f32> {
        let prev = self.effective_event_fraction;
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }
}
