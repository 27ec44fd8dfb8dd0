// src/process/mod.rs
//
// Turns the tables of one report into Arrow record batches, one per
// (metadata, corrections) pair.

pub mod convert;
pub mod date_parser;
pub mod humidity;
pub mod raw_table;
pub mod utils;

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, StringArray},
    record_batch::RecordBatch,
};
use scraper::Html;
use std::{collections::HashSet, fmt, sync::Arc};
use tracing::{debug, error};

use crate::schema::{self, DELAY_LINE, HUMIDITY, RAIL, REQUIRED_METADATA, TIMESTAMP};
use raw_table::HtmlTable;

/// Why a table pair contributed no rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The corrections table has no body rows.
    EmptyCorrections,
    /// The transposed metadata lacks required fields.
    MissingColumns(Vec<String>),
    /// The metadata table has labels but no values.
    EmptyMetadata,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyCorrections => write!(f, "corrections table is empty"),
            SkipReason::MissingColumns(cols) => write!(f, "metadata is missing {:?}", cols),
            SkipReason::EmptyMetadata => write!(f, "metadata has no values"),
        }
    }
}

/// Result of processing one pair of tables.
#[derive(Debug)]
pub enum PairOutcome {
    Block(RecordBatch),
    Skip(SkipReason),
}

/// One metadata row, projected to the fields every output row carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub timestamp: String,
    pub delay_line: String,
}

/// Walk `tables` in pairs `(0,1), (2,3), …` and build one batch per usable pair.
/// A trailing unpaired table is ignored. Failures stay local to their pair.
pub fn process_tables(tables: &[HtmlTable], document: &Html, display_name: &str) -> Vec<RecordBatch> {
    if tables.len() % 2 == 1 {
        debug!(
            file = %display_name,
            tables = tables.len(),
            "odd table count, ignoring trailing table"
        );
    }

    let humidity = humidity::extract_humidity(document, display_name);
    let mut blocks = Vec::new();

    for (pair, chunk) in tables.chunks_exact(2).enumerate() {
        let (meta, corr) = (&chunk[0], &chunk[1]);
        match process_pair(meta, corr, humidity) {
            Ok(PairOutcome::Block(batch)) => {
                debug!(file = %display_name, pair, rows = batch.num_rows(), "pair processed");
                blocks.push(batch);
            }
            Ok(PairOutcome::Skip(reason)) => {
                debug!(file = %display_name, pair, "skipping pair: {}", reason);
            }
            Err(e) => {
                error!(file = %display_name, pair, "error processing tables: {:#}", e);
            }
        }
    }

    blocks
}

/// Join one metadata table with its corrections table.
pub fn process_pair(
    meta: &HtmlTable,
    corr: &HtmlTable,
    humidity: Option<f64>,
) -> Result<PairOutcome> {
    // 1) one output row per correction row
    let n = corr.row_count();
    if n == 0 {
        return Ok(PairOutcome::Skip(SkipReason::EmptyCorrections));
    }

    // 2) + 3) metadata labels become columns; both required fields must be there
    let records = match metadata_records(meta) {
        Ok(records) => records,
        Err(reason) => return Ok(PairOutcome::Skip(reason)),
    };

    // 5) nothing to replicate
    if records.is_empty() {
        return Ok(PairOutcome::Skip(SkipReason::EmptyMetadata));
    }

    // 6) align metadata with the correction rows
    let replicated = replicate_rows(&records, n);

    // 4) timestamps parsed leniently
    let ts_col = convert::timestamp_column(replicated.iter().map(|r| Some(r.timestamp.as_str())));
    let delay_col: ArrayRef = Arc::new(StringArray::from_iter_values(
        replicated.iter().map(|r| r.delay_line.as_str()),
    ));

    // 8) same humidity on every row
    let humidity_text = humidity.map(utils::format_percent);
    let humidity_col: ArrayRef = Arc::new(StringArray::from(vec![humidity_text.as_deref(); n]));

    // 7) flatten the grouped header, index → explicit rail column
    let corr = corr.clone().drop_top_level();
    let rail_type = utils::infer_column_dtype(corr.index.iter().map(String::as_str));
    let rail_col = convert::typed_column(corr.index.iter().map(String::as_str), &rail_type)
        .context("building rail number column")?;

    let mut taken: HashSet<String> = [TIMESTAMP, DELAY_LINE, HUMIDITY, RAIL]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut fields = Vec::with_capacity(corr.columns.len());
    let mut values = Vec::with_capacity(corr.columns.len());
    for j in 0..corr.columns.len() {
        let mut name = corr.column_name(j);
        if name.is_empty() {
            name = (j + 1).to_string();
        }
        let name = unique_name(&mut taken, name);
        let dtype = utils::infer_column_dtype(corr.column(j));
        let col = convert::typed_column(corr.column(j), &dtype)
            .with_context(|| format!("building correction column {:?}", name))?;
        fields.push((name, dtype));
        values.push(col);
    }

    // 9) side by side
    let schema = schema::block_schema(rail_type, &fields);
    let mut columns = vec![ts_col, delay_col, humidity_col, rail_col];
    columns.extend(values);
    let batch = RecordBatch::try_new(schema, columns).context("assembling pair batch")?;
    Ok(PairOutcome::Block(batch))
}

/// Transpose `meta` and project the required fields of every resulting row.
pub fn metadata_records(meta: &HtmlTable) -> Result<Vec<MetadataRecord>, SkipReason> {
    let t = meta.transpose();
    let missing: Vec<String> = REQUIRED_METADATA
        .iter()
        .filter(|c| t.position(c).is_none())
        .map(|c| c.to_string())
        .collect();
    let (Some(ts), Some(dl)) = (t.position(TIMESTAMP), t.position(DELAY_LINE)) else {
        return Err(SkipReason::MissingColumns(missing));
    };
    Ok(t
        .rows
        .iter()
        .map(|row| MetadataRecord {
            timestamp: row[ts].clone(),
            delay_line: row[dl].clone(),
        })
        .collect())
}

/// Repeat `rows` as a block until `n` rows are produced.
/// A single row becomes `n` identical rows.
pub fn replicate_rows<T: Clone>(rows: &[T], n: usize) -> Vec<T> {
    rows.iter().cycle().take(n).cloned().collect()
}

fn unique_name(taken: &mut HashSet<String>, name: String) -> String {
    if taken.insert(name.clone()) {
        return name;
    }
    let mut k = 1;
    loop {
        let candidate = format!("{}.{}", name, k);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        k += 1;
    }
}

/// Total rows across `blocks`.
pub fn rows_in(blocks: &[RecordBatch]) -> usize {
    blocks.iter().map(RecordBatch::num_rows).sum()
}
