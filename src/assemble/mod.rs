// src/assemble/mod.rs
//! Drives one ingestion run: fetch every (variant, month) file in the range,
//! normalize what arrives, and concatenate it all into a single dataset.

use anyhow::{Context, Result};
use arrow::array::{new_null_array, ArrayRef};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{Field, Schema as ArrowSchema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use reqwest::Client;
use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::fetch::{files, urls};
use crate::schema::{self, CANONICAL_SCHEMA};

/// Run one ingestion pass over the configured variants and date range.
///
/// The extraction timestamp is captured once here, so every row landed by
/// this run carries the same `extracted_at` regardless of when its file was
/// actually fetched.
pub async fn ingest(client: &Client, base_url: &str, config: &IngestConfig) -> Result<RecordBatch> {
    run_ingest(client, base_url, config, Utc::now()).await
}

/// [`ingest`] with the extraction timestamp supplied by the caller.
///
/// Pairs are attempted variant-major in config order, months ascending within
/// each variant; that enumeration order fixes the row order of the result. A
/// pair whose fetch or decode fails is logged and skipped, and the run
/// carries on — only date/config problems abort the whole run.
pub async fn run_ingest(
    client: &Client,
    base_url: &str,
    config: &IngestConfig,
    extracted_at: DateTime<Utc>,
) -> Result<RecordBatch> {
    let months = urls::months_in_range(config.start_date, config.end_date)?;
    info!(
        variants = config.taxi_types.len(),
        months = months.len(),
        "starting ingestion run"
    );

    let mut normalized: Vec<RecordBatch> = Vec::new();
    for taxi_type in &config.taxi_types {
        for &month in &months {
            let url = urls::trip_data_url(base_url, taxi_type, month);
            match files::fetch_trip_file(client, &url).await {
                Ok(batches) => {
                    for batch in &batches {
                        normalized.push(schema::normalize_batch(batch, taxi_type, extracted_at)?);
                    }
                }
                Err(err) => {
                    warn!(
                        taxi_type = %taxi_type,
                        month = %month,
                        "skipping unavailable file: {:#}",
                        err
                    );
                }
            }
        }
    }

    let dataset = concat_aligned(&normalized)?;
    info!(
        rows = dataset.num_rows(),
        columns = dataset.num_columns(),
        "assembled dataset"
    );
    Ok(dataset)
}

/// Concatenate normalized batches into one batch on their union schema,
/// preserving the order the batches were accumulated in.
///
/// The union starts with the canonical columns, then any passthrough columns
/// in first-seen order. A batch missing a column contributes nulls for it;
/// canonical columns are cast to their declared types, passthrough columns to
/// the type they were first seen with. With no batches at all the result is
/// the canonical empty dataset — downstream always gets a well-formed batch.
pub fn concat_aligned(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let target = union_schema(batches);
    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(target));
    }
    let aligned = batches
        .iter()
        .map(|batch| align_to(batch, &target))
        .collect::<Result<Vec<_>>>()?;
    concat_batches(&target, &aligned).context("concatenating aligned batches")
}

fn union_schema(batches: &[RecordBatch]) -> SchemaRef {
    let mut fields: Vec<Field> = CANONICAL_SCHEMA
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    let mut seen: HashSet<String> = fields.iter().map(|f| f.name().clone()).collect();

    for batch in batches {
        let schema = batch.schema();
        for field in schema.fields() {
            if seen.insert(field.name().clone()) {
                fields.push(Field::new(field.name(), field.data_type().clone(), true));
            }
        }
    }
    Arc::new(ArrowSchema::new(fields))
}

/// Land the assembled dataset as `<out_dir>/trips.parquet` for the
/// downstream appender. Writes to a temp path first so a partial write never
/// sits under the final name.
pub fn write_dataset(dataset: &RecordBatch, out_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output dir {}", out_dir.display()))?;
    let out_path = out_dir.join("trips.parquet");
    let temp_path = out_path.with_extension("tmp");

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(3)?))
        .set_dictionary_enabled(true)
        .build();
    let file = File::create(&temp_path)
        .with_context(|| format!("creating {}", temp_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, dataset.schema(), Some(props))?;
    writer.write(dataset)?;
    writer.close()?;
    fs::rename(&temp_path, &out_path)
        .with_context(|| format!("moving dataset into place at {}", out_path.display()))?;

    info!(path = %out_path.display(), rows = dataset.num_rows(), "wrote dataset");
    Ok(out_path)
}

fn align_to(batch: &RecordBatch, target: &SchemaRef) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(target.fields().len());
    for field in target.fields() {
        let column = match batch.column_by_name(field.name()) {
            Some(column) if column.data_type() == field.data_type() => column.clone(),
            Some(column) => cast(column, field.data_type()).with_context(|| {
                format!(
                    "casting column `{}` to {:?}",
                    field.name(),
                    field.data_type()
                )
            })?,
            None => new_null_array(field.data_type(), rows),
        };
        columns.push(column);
    }
    RecordBatch::try_new(target.clone(), columns).context("aligning batch to union schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Float64Array, Int32Array, Int64Array, StringArray};
    use arrow::datatypes::DataType;

    fn batch(fields: Vec<Field>, columns: Vec<ArrayRef>) -> RecordBatch {
        RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), columns).unwrap()
    }

    #[test]
    fn no_batches_yield_canonical_empty_dataset() -> Result<()> {
        let dataset = concat_aligned(&[])?;
        assert_eq!(dataset.num_rows(), 0);
        assert_eq!(dataset.schema(), *CANONICAL_SCHEMA);
        Ok(())
    }

    #[test]
    fn canonical_columns_cast_to_declared_types() -> Result<()> {
        // older files carry vendor_id as Int32; the output contract is Int64
        let b = batch(
            vec![Field::new("vendor_id", DataType::Int32, true)],
            vec![Arc::new(Int32Array::from(vec![1, 2, 3])) as ArrayRef],
        );
        let dataset = concat_aligned(&[b])?;
        let vendor = dataset
            .column_by_name("vendor_id")
            .unwrap()
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert_eq!(vendor.values().as_ref(), &[1i64, 2, 3]);
        Ok(())
    }

    #[test]
    fn union_fills_missing_columns_with_nulls() -> Result<()> {
        let with_fee = batch(
            vec![
                Field::new("fare_amount", DataType::Float64, true),
                Field::new("airport_fee", DataType::Float64, true),
            ],
            vec![
                Arc::new(Float64Array::from(vec![10.0])) as ArrayRef,
                Arc::new(Float64Array::from(vec![1.25])) as ArrayRef,
            ],
        );
        let without_fee = batch(
            vec![Field::new("fare_amount", DataType::Float64, true)],
            vec![Arc::new(Float64Array::from(vec![20.0])) as ArrayRef],
        );

        let dataset = concat_aligned(&[with_fee, without_fee])?;
        assert_eq!(dataset.num_rows(), 2);
        // passthrough column lands after the canonical ones
        assert_eq!(
            dataset.schema().fields().last().unwrap().name(),
            "airport_fee"
        );
        let fee = dataset
            .column_by_name("airport_fee")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(fee.is_valid(0));
        assert!(fee.is_null(1));
        // accumulation order is preserved through concatenation
        let fares = dataset
            .column_by_name("fare_amount")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(fares.value(0), 10.0);
        assert_eq!(fares.value(1), 20.0);
        Ok(())
    }

    #[test]
    fn writes_dataset_under_final_name() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let dataset = concat_aligned(&[batch(
            vec![Field::new("fare_amount", DataType::Float64, true)],
            vec![Arc::new(Float64Array::from(vec![10.0, 20.0])) as ArrayRef],
        )])?;

        let path = write_dataset(&dataset, dir.path())?;
        assert_eq!(path, dir.path().join("trips.parquet"));
        assert!(!dir.path().join("trips.tmp").exists());

        let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(
            File::open(&path)?,
        )?
        .build()?;
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 2);
        Ok(())
    }

    #[test]
    fn concatenation_is_deterministic() -> Result<()> {
        let batches = vec![
            batch(
                vec![Field::new("taxi_type", DataType::Utf8, true)],
                vec![Arc::new(StringArray::from(vec!["yellow", "yellow"])) as ArrayRef],
            ),
            batch(
                vec![Field::new("taxi_type", DataType::Utf8, true)],
                vec![Arc::new(StringArray::from(vec!["green"])) as ArrayRef],
            ),
        ];
        let first = concat_aligned(&batches)?;
        let second = concat_aligned(&batches)?;
        assert_eq!(first, second);
        let kinds = first
            .column_by_name("taxi_type")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        let kinds: Vec<&str> = (0..kinds.len()).map(|i| kinds.value(i)).collect();
        assert_eq!(kinds, vec!["yellow", "yellow", "green"]);
        Ok(())
    }
}
