// src/consolidate/mod.rs
//
// Stacks per-pair batches from every report into one dataset.

use anyhow::{Context, Result};
use arrow::{
    array::{new_null_array, ArrayRef},
    compute::{cast, concat_batches},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::process::convert::coerce_timestamps;
use crate::schema::{timestamp_type, TIMESTAMP};

/// The consolidated corrections table. Empty when no report produced rows.
#[derive(Debug, Clone, Default)]
pub struct ConsolidatedDataset {
    batch: Option<RecordBatch>,
}

impl ConsolidatedDataset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    pub fn num_rows(&self) -> usize {
        self.batch.as_ref().map_or(0, RecordBatch::num_rows)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .as_ref()
            .map(|b| b.schema().fields().iter().map(|f| f.name().clone()).collect())
            .unwrap_or_default()
    }

    pub fn schema(&self) -> Option<SchemaRef> {
        self.batch.as_ref().map(RecordBatch::schema)
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.as_ref()?.column_by_name(name)
    }

    pub fn batch(&self) -> Option<&RecordBatch> {
        self.batch.as_ref()
    }

    pub fn into_batch(self) -> Option<RecordBatch> {
        self.batch
    }
}

/// Stack `blocks` in the order given. Columns are unioned by name in order of
/// first appearance; a block without a column gets nulls there. `Timestamp` is
/// coerced to Timestamp(ms) throughout.
pub fn consolidate(blocks: Vec<RecordBatch>) -> Result<ConsolidatedDataset> {
    if blocks.is_empty() {
        return Ok(ConsolidatedDataset::empty());
    }

    let schema = union_schema(&blocks);
    let aligned = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| align(b, &schema).with_context(|| format!("aligning block #{}", i)))
        .collect::<Result<Vec<_>>>()?;
    let batch = concat_batches(&schema, &aligned).context("concatenating blocks")?;

    Ok(ConsolidatedDataset { batch: Some(batch) })
}

fn union_schema(blocks: &[RecordBatch]) -> SchemaRef {
    let mut fields: Vec<(String, DataType)> = Vec::new();
    for b in blocks {
        for f in b.schema().fields() {
            match fields.iter_mut().find(|(name, _)| name == f.name()) {
                Some((_, dt)) => *dt = common_type(dt, f.data_type()),
                None => fields.push((f.name().clone(), f.data_type().clone())),
            }
        }
    }
    Arc::new(Schema::new(
        fields
            .into_iter()
            .map(|(name, dt)| {
                let dt = if name == TIMESTAMP { timestamp_type() } else { dt };
                Field::new(name, dt, true)
            })
            .collect::<Vec<_>>(),
    ))
}

/// Widest type two blocks' versions of a column can share.
fn common_type(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        _ if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        _ => DataType::Utf8,
    }
}

fn align(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let columns = schema
        .fields()
        .iter()
        .map(|f| match batch.column_by_name(f.name()) {
            Some(col) if f.name() == TIMESTAMP => coerce_timestamps(col),
            Some(col) if col.data_type() == f.data_type() => Ok(col.clone()),
            Some(col) => cast(col, f.data_type())
                .with_context(|| format!("casting {} to {}", f.name(), f.data_type())),
            None => Ok(new_null_array(f.data_type(), rows)),
        })
        .collect::<Result<Vec<_>>>()?;
    RecordBatch::try_new(schema.clone(), columns).map_err(Into::into)
}
