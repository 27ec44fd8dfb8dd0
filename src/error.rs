// src/error.rs

use thiserror::Error;

/// Failures while normalizing a caller-supplied date bound.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("{param} must have format 'YYYY-MM-DD', got {value:?}")]
    InvalidFormat { param: String, value: String },

    #[error("{param} must be a date, a datetime or a 'YYYY-MM-DD' string, got {found}")]
    UnsupportedType { param: String, found: String },

    #[error("cannot localize {param} at offset {offset}: {reason}")]
    Timezone {
        param: String,
        offset: String,
        reason: String,
    },
}

/// Failures while binning a dataset for the heatmap view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeatmapError {
    #[error("dataset is missing columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("column {column} has unsupported type {data_type}")]
    UnsupportedType { column: String, data_type: String },

    #[error("bin width must be positive")]
    InvalidBinWidth,

    #[error("rail number {max_rail} needs more than {limit} bins of width {bin_width}")]
    TooManyBins {
        max_rail: i64,
        bin_width: u32,
        limit: usize,
    },
}
