// src/locate/mod.rs

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use glob::{glob, Pattern};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Prefix of AppleDouble sidecar files that macOS leaves next to real files.
pub const SIDECAR_PREFIX: &str = "._";

/// A report found on disk, with the date carried in its filename.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportFile {
    pub path: PathBuf,
    pub embedded_date: NaiveDate,
}

impl ReportFile {
    /// File name for log lines.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Regex matching `<prefix>_YYYY-MM-DD.html`, capturing the date.
pub fn filename_regex(prefix: &str) -> Result<Regex> {
    let pattern = format!(r"^{}_(\d{{4}}-\d{{2}}-\d{{2}})\.html$", regex::escape(prefix));
    Regex::new(&pattern).with_context(|| format!("building filename pattern for {:?}", prefix))
}

/// Find every `<prefix>_YYYY-MM-DD.html` at any depth under `root` whose date
/// falls in `[start, end]`, sorted by path.
#[instrument(level = "info", skip(root, start, end), fields(dir = %root.display()))]
pub fn locate_reports(
    root: &Path,
    prefix: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    date_format: &str,
) -> Result<Vec<ReportFile>> {
    let root_str = root
        .to_str()
        .with_context(|| format!("root {:?} is not valid UTF-8", root))?;
    let pattern = format!("{}/**/*.html", Pattern::escape(root_str));
    let name_re = filename_regex(prefix)?;

    let mut found = Vec::new();
    for entry in glob(&pattern).with_context(|| format!("invalid glob pattern {}", pattern))? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                warn!("cannot read glob entry: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        if let Some(report) = match_report(&path, &name_re, date_format) {
            // day-level bounds; a time on `start` must not exclude its own day
            let day = report.embedded_date;
            if start.date() <= day && day <= end.date() {
                found.push(report);
            }
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    info!(count = found.len(), "located reports");
    Ok(found)
}

/// Check a single path against the naming contract.
fn match_report(path: &Path, name_re: &Regex, date_format: &str) -> Option<ReportFile> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with(SIDECAR_PREFIX) {
        debug!(file = %name, "ignoring sidecar file");
        return None;
    }
    let caps = name_re.captures(name)?;
    match NaiveDate::parse_from_str(&caps[1], date_format) {
        Ok(embedded_date) => Some(ReportFile {
            path: path.to_path_buf(),
            embedded_date,
        }),
        Err(e) => {
            debug!(file = %name, "filename date does not parse: {}", e);
            None
        }
    }
}
