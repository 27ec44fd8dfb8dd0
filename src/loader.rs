// src/loader.rs
//
// Entry point: date range in, consolidated dataset out. Never fails; every
// problem ends up in the log and in the returned `LoadReport`.

use anyhow::Result;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::config::LoaderConfig;
use crate::consolidate::{consolidate, ConsolidatedDataset};
use crate::error::DateError;
use crate::extract::extract_report;
use crate::locate::{locate_reports, ReportFile};
use crate::process::{
    self,
    date_parser::{check_timezone, ensure_datetime, DateInput},
};

/// What happened to one report file.
#[derive(Debug)]
pub enum FileOutcome {
    Success { batches: Vec<RecordBatch>, rows: usize },
    Failure { reason: String },
}

#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub display_name: String,
    pub outcome: FileOutcome,
}

impl FileResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FileOutcome::Success { .. })
    }
}

/// Everything a caller may want to surface after a load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub dataset: ConsolidatedDataset,
    pub files: Vec<FileResult>,
    pub date_error: Option<DateError>,
}

impl LoadReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &FileResult> {
        self.files.iter().filter(|f| f.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileResult> {
        self.files.iter().filter(|f| !f.is_success())
    }

    pub fn into_dataset(self) -> ConsolidatedDataset {
        self.dataset
    }
}

/// Load every report dated within `[start, end]` under `config.root`.
pub fn load_corrections(config: &LoaderConfig, start: &DateInput, end: &DateInput) -> LoadReport {
    let started = Instant::now();

    let (start, end) = match normalize_range(config, start, end) {
        Ok(range) => range,
        Err(e) => {
            error!("error converting dates: {}", e);
            return LoadReport {
                date_error: Some(e),
                ..LoadReport::default()
            };
        }
    };
    if start.date() > end.date() {
        warn!(%start, %end, "start is after end; nothing to load");
    }

    let reports = match locate_reports(&config.root, &config.prefix, start, end, &config.date_format) {
        Ok(r) => r,
        Err(e) => {
            error!("error locating reports under {}: {:#}", config.root.display(), e);
            Vec::new()
        }
    };

    let files: Vec<FileResult> = if config.parallel {
        reports.par_iter().map(process_file).collect()
    } else {
        reports.iter().map(process_file).collect()
    };

    let mut blocks = Vec::new();
    for f in &files {
        match &f.outcome {
            FileOutcome::Success { batches, rows } => {
                info!(file = %f.display_name, rows, "processed file");
                blocks.extend(batches.iter().cloned());
            }
            FileOutcome::Failure { reason } => {
                error!(file = %f.display_name, "error processing file: {}", reason);
            }
        }
    }

    let dataset = match consolidate(blocks) {
        Ok(ds) => ds,
        Err(e) => {
            error!("error consolidating results: {:#}", e);
            ConsolidatedDataset::empty()
        }
    };
    if dataset.is_empty() {
        warn!("no results generated");
    }
    info!(
        files = files.len(),
        rows = dataset.num_rows(),
        elapsed = ?started.elapsed(),
        "load finished"
    );

    LoadReport {
        dataset,
        files,
        date_error: None,
    }
}

/// Shorthand with the default config, for callers that only need the table.
pub fn corrections_loader(
    start: impl Into<DateInput>,
    end: impl Into<DateInput>,
) -> ConsolidatedDataset {
    load_corrections(&LoaderConfig::default(), &start.into(), &end.into()).into_dataset()
}

fn normalize_range(
    config: &LoaderConfig,
    start: &DateInput,
    end: &DateInput,
) -> Result<(NaiveDateTime, NaiveDateTime), DateError> {
    let start = ensure_datetime(start, "start")?;
    let end = ensure_datetime(end, "end")?;
    check_timezone(start, &config.timezone, "start")?;
    check_timezone(end, &config.timezone, "end")?;
    Ok((start, end))
}

/// Read, parse and process one report; any failure stays inside its `FileResult`.
#[instrument(level = "debug", skip(report), fields(file = %report.display_name()))]
pub fn process_file(report: &ReportFile) -> FileResult {
    let display_name = report.display_name();
    let outcome = match run_file(report, &display_name) {
        Ok(batches) => FileOutcome::Success {
            rows: process::rows_in(&batches),
            batches,
        },
        Err(e) => FileOutcome::Failure {
            reason: format!("{:#}", e),
        },
    };
    FileResult {
        path: report.path.clone(),
        display_name,
        outcome,
    }
}

fn run_file(report: &ReportFile, display_name: &str) -> Result<Vec<RecordBatch>> {
    let extracted = extract_report(&report.path, display_name)?;
    debug!(
        file = %display_name,
        bytes = extracted.text.len(),
        tables = extracted.tables.len(),
        "read report"
    );
    Ok(process::process_tables(
        &extracted.tables,
        &extracted.document,
        display_name,
    ))
}
