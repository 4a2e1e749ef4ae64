// src/schema/mod.rs
//! The canonical trip-record schema and the per-variant column renames that
//! reconcile the archive's source schemas into it.

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

/// Derived column naming the source variant a row came from.
pub const TAXI_TYPE: &str = "taxi_type";
/// Derived column carrying the run's single extraction timestamp.
pub const EXTRACTED_AT: &str = "extracted_at";

/// The unified schema the materialized table declares: 18 trip columns plus
/// the two derived ones. Every assembled dataset carries at least these
/// columns, in this order.
pub static CANONICAL_SCHEMA: Lazy<SchemaRef> = Lazy::new(|| {
    let ts = DataType::Timestamp(TimeUnit::Microsecond, None);
    Arc::new(ArrowSchema::new(vec![
        Field::new("vendor_id", DataType::Int64, true),
        Field::new("pickup_datetime", ts.clone(), true),
        Field::new("dropoff_datetime", ts.clone(), true),
        Field::new("passenger_count", DataType::Float64, true),
        Field::new("trip_distance", DataType::Float64, true),
        Field::new("ratecode_id", DataType::Float64, true),
        Field::new("store_and_fwd_flag", DataType::Utf8, true),
        Field::new("pu_location_id", DataType::Int64, true),
        Field::new("do_location_id", DataType::Int64, true),
        Field::new("payment_type", DataType::Int64, true),
        Field::new("fare_amount", DataType::Float64, true),
        Field::new("extra", DataType::Float64, true),
        Field::new("mta_tax", DataType::Float64, true),
        Field::new("tip_amount", DataType::Float64, true),
        Field::new("tolls_amount", DataType::Float64, true),
        Field::new("improvement_surcharge", DataType::Float64, true),
        Field::new("total_amount", DataType::Float64, true),
        Field::new("congestion_surcharge", DataType::Float64, true),
        Field::new(TAXI_TYPE, DataType::Utf8, true),
        Field::new(EXTRACTED_AT, ts, true),
    ]))
});

/// Renames every variant shares: the archive's CamelCase ID columns.
static SHARED_RENAMES: &[(&str, &str)] = &[
    ("VendorID", "vendor_id"),
    ("RatecodeID", "ratecode_id"),
    ("PULocationID", "pu_location_id"),
    ("DOLocationID", "do_location_id"),
];

/// Native → canonical column renames for one source variant.
///
/// Yellow files prefix their datetime columns `tpep_` and green files
/// `lpep_`; both land on the same canonical pickup/dropoff names. Keying the
/// map per variant keeps that overlap unambiguous as variants are added.
/// Unknown variants get the shared renames only.
pub fn renames_for(taxi_type: &str) -> HashMap<&'static str, &'static str> {
    let mut renames: HashMap<&str, &str> = SHARED_RENAMES.iter().copied().collect();
    match taxi_type {
        "yellow" => {
            renames.insert("tpep_pickup_datetime", "pickup_datetime");
            renames.insert("tpep_dropoff_datetime", "dropoff_datetime");
        }
        "green" => {
            renames.insert("lpep_pickup_datetime", "pickup_datetime");
            renames.insert("lpep_dropoff_datetime", "dropoff_datetime");
        }
        _ => {}
    }
    renames
}

/// Rename a raw batch's columns to their canonical names and append the
/// `taxi_type` and `extracted_at` columns. Columns with no rename entry pass
/// through untouched; no columns are dropped or reordered here.
pub fn normalize_batch(
    batch: &RecordBatch,
    taxi_type: &str,
    extracted_at: DateTime<Utc>,
) -> Result<RecordBatch> {
    let renames = renames_for(taxi_type);
    let schema = batch.schema();
    let rows = batch.num_rows();

    let mut fields: Vec<Field> = Vec::with_capacity(batch.num_columns() + 2);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns() + 2);
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let name = renames
            .get(field.name().as_str())
            .copied()
            .unwrap_or_else(|| field.name().as_str());
        fields.push(Field::new(name, field.data_type().clone(), true));
        columns.push(column.clone());
    }

    fields.push(Field::new(TAXI_TYPE, DataType::Utf8, true));
    columns.push(Arc::new(StringArray::from(vec![taxi_type; rows])) as ArrayRef);

    let micros = extracted_at.timestamp_micros();
    fields.push(Field::new(
        EXTRACTED_AT,
        DataType::Timestamp(TimeUnit::Microsecond, None),
        true,
    ));
    columns.push(Arc::new(TimestampMicrosecondArray::from(vec![micros; rows])) as ArrayRef);

    RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), columns)
        .context("rebuilding normalized batch")
}
