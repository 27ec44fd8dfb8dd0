// src/export.rs

use anyhow::{bail, Context, Result};
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{fs, fs::File, path::Path};
use tracing::info;

use crate::consolidate::ConsolidatedDataset;

/// Render the first `limit` rows as an ASCII table.
pub fn format_dataset(dataset: &ConsolidatedDataset, limit: usize) -> Result<String> {
    let Some(batch) = dataset.batch() else {
        return Ok(String::from("(no rows)"));
    };
    let shown = batch.slice(0, limit.min(batch.num_rows()));
    let table = pretty_format_batches(&[shown]).context("formatting dataset")?;
    let mut out = table.to_string();
    if batch.num_rows() > limit {
        out.push_str(&format!("\n… {} more rows", batch.num_rows() - limit));
    }
    Ok(out)
}

/// Write the dataset to a single Parquet file, via a temp file + rename.
pub fn write_parquet(dataset: &ConsolidatedDataset, path: &Path) -> Result<()> {
    let Some(batch) = dataset.batch() else {
        bail!("refusing to write an empty dataset to {}", path.display());
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let tmp_path = path.with_extension("parquet.tmp");
    let file =
        File::create(&tmp_path).with_context(|| format!("creating {}", tmp_path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(batch).context("writing dataset batch")?;
    writer.close().context("closing Parquet writer")?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("renaming {} -> {}", tmp_path.display(), path.display()))?;
    info!(path = %path.display(), rows = batch.num_rows(), "wrote parquet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::consolidate;
    use arrow::{
        array::Int64Array,
        datatypes::{DataType, Field, Schema},
        record_batch::RecordBatch,
    };
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn dataset(n: i64) -> ConsolidatedDataset {
        let schema = Arc::new(Schema::new(vec![Field::new("Rail number", DataType::Int64, true)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from_iter_values(1..=n))])
                .unwrap();
        consolidate(vec![batch]).unwrap()
    }

    #[test]
    fn writes_and_reads_back_row_count() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out/corrections.parquet");
        write_parquet(&dataset(4), &path)?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let rows: usize = reader.map(|b| b.map(|b| b.num_rows())).sum::<Result<usize, _>>()?;
        assert_eq!(rows, 4);
        assert!(!path.with_extension("parquet.tmp").exists());
        Ok(())
    }

    #[test]
    fn empty_dataset_is_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.parquet");
        assert!(write_parquet(&ConsolidatedDataset::empty(), &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn formats_with_limit() -> Result<()> {
        let text = format_dataset(&dataset(5), 2)?;
        assert!(text.contains("Rail number"));
        assert!(text.contains("3 more rows"));
        assert_eq!(format_dataset(&ConsolidatedDataset::empty(), 10)?, "(no rows)");
        Ok(())
    }
}
