// src/heatmap/mod.rs
//
// Per-day counts of corrections by delay line and rail-number bucket.
// Rendering is left to whoever consumes `DailyHeatmap`.

use arrow::{
    array::{Array, ArrayRef, Float64Array, Int64Array, StringArray, TimestampMillisecondArray},
    compute::cast,
    datatypes::DataType,
};
use chrono::NaiveDate;
use std::{cmp::Ordering, collections::BTreeMap, fmt};

use crate::consolidate::ConsolidatedDataset;
use crate::error::HeatmapError;
use crate::process::{convert::coerce_timestamps, date_parser::millis_to_datetime};
use crate::schema::{DELAY_LINE, HEATMAP_COLUMNS, RAIL, TIMESTAMP};

pub const DEFAULT_BIN_WIDTH: u32 = 5;

/// Upper bound on bins per day; larger rail numbers are rejected.
pub const MAX_BINS: usize = 10_000;

/// Right-closed rail interval `(lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RailBin {
    pub lo: i64,
    pub hi: i64,
}

impl fmt::Display for RailBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.lo, self.hi)
    }
}

/// Delay line × rail bin counts for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyHeatmap {
    pub date: NaiveDate,
    pub delay_lines: Vec<String>,
    pub bins: Vec<RailBin>,
    /// `counts[line][bin]`
    pub counts: Vec<Vec<u32>>,
}

impl DailyHeatmap {
    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }
}

impl fmt::Display for DailyHeatmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Corrections heatmap for {}", self.date)?;
        let labels: Vec<String> = self.bins.iter().map(RailBin::to_string).collect();
        let line_w = self
            .delay_lines
            .iter()
            .map(String::len)
            .chain(std::iter::once(DELAY_LINE.len()))
            .max()
            .unwrap_or(0);
        let cell_w = labels.iter().map(String::len).max().unwrap_or(1).max(4);

        write!(f, "{:<line_w$}", DELAY_LINE)?;
        for l in &labels {
            write!(f, " {:>cell_w$}", l)?;
        }
        writeln!(f)?;
        for (line, row) in self.delay_lines.iter().zip(&self.counts) {
            write!(f, "{:<line_w$}", line)?;
            for c in row {
                write!(f, " {:>cell_w$}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Bin a consolidated dataset into one heatmap per calendar day, oldest first.
pub fn heatmaps(
    dataset: &ConsolidatedDataset,
    bin_width: u32,
) -> Result<Vec<DailyHeatmap>, HeatmapError> {
    if bin_width == 0 {
        return Err(HeatmapError::InvalidBinWidth);
    }
    let Some(batch) = dataset.batch() else {
        return Ok(Vec::new());
    };
    let missing: Vec<String> = HEATMAP_COLUMNS
        .iter()
        .filter(|c| batch.column_by_name(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(HeatmapError::MissingColumns(missing));
    }
    let column = |name: &str| {
        batch
            .column_by_name(name)
            .ok_or_else(|| HeatmapError::MissingColumns(vec![name.to_string()]))
    };

    let days = day_column(column(TIMESTAMP)?)?;
    let rails = rail_column(column(RAIL)?)?;
    let lines = text_column(column(DELAY_LINE)?)?;

    // date → [(rail, delay line)]
    let mut by_day: BTreeMap<NaiveDate, Vec<(f64, String)>> = BTreeMap::new();
    for i in 0..batch.num_rows() {
        let (Some(day), Some(rail), Some(line)) = (days[i], rails[i], lines[i].as_ref()) else {
            continue;
        };
        by_day.entry(day).or_default().push((rail, line.clone()));
    }

    let mut maps = Vec::with_capacity(by_day.len());
    for (date, obs) in by_day {
        if let Some(map) = crosstab(date, &obs, bin_width)? {
            maps.push(map);
        }
    }
    Ok(maps)
}

/// Edges `0, w, 2w, …` below `floor(max) + 10`, as consecutive right-closed bins.
/// Fails when that would take more than `MAX_BINS` bins.
pub fn rail_bins(max_rail: f64, width: u32) -> Result<Vec<RailBin>, HeatmapError> {
    if width == 0 {
        return Err(HeatmapError::InvalidBinWidth);
    }
    // `as` saturates for huge or infinite values
    let stop = (max_rail.floor() as i64).saturating_add(10);
    let width = i64::from(width);
    let edge_count = if stop <= 0 { 0 } else { (stop - 1) / width + 1 };
    if edge_count > MAX_BINS as i64 + 1 {
        return Err(HeatmapError::TooManyBins {
            max_rail: max_rail.floor() as i64,
            bin_width: width as u32,
            limit: MAX_BINS,
        });
    }
    let edges: Vec<i64> = (0..edge_count).map(|k| k * width).collect();
    Ok(edges
        .windows(2)
        .map(|w| RailBin { lo: w[0], hi: w[1] })
        .collect())
}

fn crosstab(
    date: NaiveDate,
    obs: &[(f64, String)],
    width: u32,
) -> Result<Option<DailyHeatmap>, HeatmapError> {
    let max_rail = obs.iter().map(|(r, _)| *r).fold(f64::NAN, f64::max);
    if max_rail.is_nan() {
        return Ok(None);
    }
    let bins = rail_bins(max_rail, width)?;

    // line → bin index → count
    let mut table: BTreeMap<LineKey, BTreeMap<usize, u32>> = BTreeMap::new();
    for (rail, line) in obs {
        let Some(k) = bins
            .iter()
            .position(|b| (b.lo as f64) < *rail && *rail <= b.hi as f64)
        else {
            continue;
        };
        *table
            .entry(LineKey(line.clone()))
            .or_default()
            .entry(k)
            .or_default() += 1;
    }
    if table.is_empty() {
        return Ok(None);
    }

    let mut used: Vec<usize> = table.values().flat_map(|m| m.keys().copied()).collect();
    used.sort_unstable();
    used.dedup();

    let counts = table
        .values()
        .map(|m| used.iter().map(|k| m.get(k).copied().unwrap_or(0)).collect())
        .collect();
    Ok(Some(DailyHeatmap {
        date,
        delay_lines: table.into_keys().map(|k| k.0).collect(),
        bins: used.iter().map(|&k| bins[k]).collect(),
        counts,
    }))
}

/// Delay line label ordered numerically when both sides are numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineKey(String);

impl Ord for LineKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<f64>(), other.0.parse::<f64>()) {
            (Ok(a), Ok(b)) => a
                .partial_cmp(&b)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for LineKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn day_column(arr: &ArrayRef) -> Result<Vec<Option<NaiveDate>>, HeatmapError> {
    let ts = coerce_timestamps(arr).map_err(|_| unsupported(TIMESTAMP, arr))?;
    let ts = ts
        .as_any()
        .downcast_ref::<TimestampMillisecondArray>()
        .ok_or_else(|| unsupported(TIMESTAMP, arr))?;
    Ok(ts
        .iter()
        .map(|v| v.and_then(millis_to_datetime).map(|dt| dt.date()))
        .collect())
}

fn rail_column(arr: &ArrayRef) -> Result<Vec<Option<f64>>, HeatmapError> {
    match arr.data_type() {
        DataType::Int64 => Ok(arr
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| unsupported(RAIL, arr))?
            .iter()
            .map(|v| v.map(|x| x as f64))
            .collect()),
        DataType::Float64 => Ok(arr
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| unsupported(RAIL, arr))?
            .iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect()),
        DataType::Utf8 => Ok(arr
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| unsupported(RAIL, arr))?
            .iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()).filter(|x| x.is_finite()))
            .collect()),
        _ => Err(unsupported(RAIL, arr)),
    }
}

fn text_column(arr: &ArrayRef) -> Result<Vec<Option<String>>, HeatmapError> {
    let text = cast(arr, &DataType::Utf8).map_err(|_| unsupported(DELAY_LINE, arr))?;
    let text = text
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| unsupported(DELAY_LINE, arr))?;
    Ok(text.iter().map(|v| v.map(str::to_string)).collect())
}

fn unsupported(column: &str, arr: &ArrayRef) -> HeatmapError {
    HeatmapError::UnsupportedType {
        column: column.to_string(),
        data_type: arr.data_type().to_string(),
    }
}
