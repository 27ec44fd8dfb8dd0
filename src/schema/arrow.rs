// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};
use std::sync::Arc;

use super::{DELAY_LINE, HUMIDITY, RAIL, TIMESTAMP};

/// Timestamps are naive (no zone attached), millisecond precision.
pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, None)
}

/// Schema of one processed table pair:
/// - Timestamp                 → Timestamp(ms)
/// - Delay line number         → Utf8, as written in the report
/// - Tunnel Relative Humidity  → Utf8 (`"45.3%"`) or null
/// - Rail number               → `rail_type` (Int64 when every label is an integer)
/// - correction columns        → their inferred types, in table order
pub fn block_schema(rail_type: DataType, corrections: &[(String, DataType)]) -> Arc<ArrowSchema> {
    let mut fields = Vec::with_capacity(4 + corrections.len());
    fields.push(ArrowField::new(TIMESTAMP, timestamp_type(), true));
    fields.push(ArrowField::new(DELAY_LINE, DataType::Utf8, true));
    fields.push(ArrowField::new(HUMIDITY, DataType::Utf8, true));
    fields.push(ArrowField::new(RAIL, rail_type, true));
    for (name, dt) in corrections {
        fields.push(ArrowField::new(name, dt.clone(), true));
    }
    Arc::new(ArrowSchema::new(fields))
}
