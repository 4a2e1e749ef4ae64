// src/fetch/files.rs
use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use reqwest::Client;
use tracing::info;
use url::Url;

/// Download one monthly trip file and decode it into Arrow record batches.
///
/// One attempt per call, no internal retry — retries belong to the
/// orchestration layer. Any network, HTTP, or decode failure comes back as an
/// error; the caller decides whether that makes the whole run fail or just
/// skips the file.
pub async fn fetch_trip_file(client: &Client, url_str: &str) -> Result<Vec<RecordBatch>> {
    let url = Url::parse(url_str).with_context(|| format!("parsing url {}", url_str))?;
    info!(url = %url, "fetching trip file");

    let bytes = client
        .get(url.as_str())
        .send()
        .await
        .with_context(|| format!("requesting {}", url))?
        .error_for_status()
        .with_context(|| format!("fetching {}", url))?
        .bytes()
        .await
        .with_context(|| format!("reading body of {}", url))?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .with_context(|| format!("reading parquet metadata of {}", url))?
        .build()
        .with_context(|| format!("opening parquet reader for {}", url))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch.with_context(|| format!("decoding parquet batch of {}", url))?);
    }
    Ok(batches)
}
