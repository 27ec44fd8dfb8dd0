// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fs, path::Path, path::PathBuf};

pub const DEFAULT_ROOT: &str = "data";
pub const DEFAULT_PREFIX: &str = "corrections_report";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
/// Local offset used to sanity-check date bounds (Chilean standard time).
pub const DEFAULT_TIMEZONE: &str = "-04:00";

/// Where reports live and how they are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory scanned recursively for reports.
    pub root: PathBuf,
    /// Filename prefix before `_YYYY-MM-DD.html`.
    pub prefix: String,
    /// chrono format of the date embedded in filenames.
    pub date_format: String,
    /// Fixed UTC offset date bounds must be localizable at.
    pub timezone: String,
    /// Process files on the rayon pool instead of one by one.
    pub parallel: bool,
    /// Optional default bounds, as written in the config file.
    pub start: Option<Value>,
    pub end: Option<Value>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            prefix: DEFAULT_PREFIX.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            parallel: false,
            start: None,
            end: None,
        }
    }
}

impl LoaderConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load a YAML config; missing keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(Into::into)
    }
}
