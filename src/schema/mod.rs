// src/schema/mod.rs
//
// Column names and Arrow types of the consolidated dataset.

pub mod arrow;

pub use arrow::{block_schema, timestamp_type};

pub const TIMESTAMP: &str = "Timestamp";
pub const DELAY_LINE: &str = "Delay line number";
pub const HUMIDITY: &str = "Tunnel Relative Humidity";
pub const RAIL: &str = "Rail number";

/// Metadata fields a pair needs before it can be projected.
pub const REQUIRED_METADATA: [&str; 2] = [TIMESTAMP, DELAY_LINE];

/// Columns the heatmap view groups and bins on.
pub const HEATMAP_COLUMNS: [&str; 3] = [TIMESTAMP, RAIL, DELAY_LINE];
