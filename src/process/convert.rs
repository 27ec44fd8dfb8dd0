use crate::process::{date_parser, utils};
use crate::schema::timestamp_type;
use anyhow::{anyhow, Result};
use arrow::{
    array::{
        Array, ArrayRef, Float64Builder, Int64Builder, StringArray, StringBuilder,
        TimestampMillisecondArray, TimestampMillisecondBuilder,
    },
    compute::cast,
    datatypes::{DataType, TimeUnit},
};
use std::sync::Arc;

/// Build a typed column from cell text; cells that don't fit the type become null.
pub fn typed_column<'a, I>(values: I, dtype: &DataType) -> Result<ArrayRef>
where
    I: IntoIterator<Item = &'a str>,
{
    let cells = values
        .into_iter()
        .map(|s| if utils::is_missing(s) { None } else { Some(s.trim()) });

    match dtype {
        DataType::Int64 => {
            let mut b = Int64Builder::new();
            for c in cells {
                b.append_option(c.and_then(|s| s.parse().ok()));
            }
            Ok(Arc::new(b.finish()))
        }
        DataType::Float64 => {
            let mut b = Float64Builder::new();
            for c in cells {
                b.append_option(c.and_then(|s| s.parse().ok()));
            }
            Ok(Arc::new(b.finish()))
        }
        DataType::Utf8 => {
            let mut b = StringBuilder::new();
            for c in cells {
                b.append_option(c);
            }
            Ok(Arc::new(b.finish()))
        }
        DataType::Timestamp(TimeUnit::Millisecond, None) => Ok(timestamp_column(cells)),
        other => Err(anyhow!("unsupported column type {}", other)),
    }
}

/// Timestamp text → Timestamp(ms); unparseable entries become null.
pub fn timestamp_column<'a, I>(values: I) -> ArrayRef
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut b = TimestampMillisecondBuilder::new();
    for v in values {
        b.append_option(v.and_then(date_parser::parse_timestamp_millis));
    }
    Arc::new(b.finish())
}

/// Bring any column to Timestamp(ms, naive). Text is parsed leniently, other
/// temporal types are cast, and anything that can't be read becomes null.
pub fn coerce_timestamps(arr: &ArrayRef) -> Result<ArrayRef> {
    let target = timestamp_type();
    if arr.data_type() == &target {
        return Ok(arr.clone());
    }
    match arr.data_type() {
        DataType::Utf8 => {
            let sarr = arr
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow!("Utf8 column is not a StringArray"))?;
            Ok(timestamp_column(sarr.iter()))
        }
        DataType::Null => Ok(Arc::new(TimestampMillisecondArray::new_null(arr.len()))),
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => {
            let cast_arr = cast(arr, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
            Ok(cast_arr)
        }
        _ => Ok(Arc::new(TimestampMillisecondArray::new_null(arr.len()))),
    }
}
