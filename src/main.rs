use anyhow::Result;
use reqwest::Client;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use tripscraper::{assemble, fetch::BASE_URL, ingest, IngestConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) read run inputs ──────────────────────────────────────────
    let config = IngestConfig::from_env()?;
    info!(
        start = %config.start_date,
        end = %config.end_date,
        variants = ?config.taxi_types,
        "run inputs"
    );
    let out_dir =
        PathBuf::from(std::env::var("INGEST_OUT_DIR").unwrap_or_else(|_| "parquet".into()));

    // ─── 3) run the ingestion pass ───────────────────────────────────
    let client = Client::new();
    let dataset = ingest(&client, BASE_URL, &config).await?;
    info!(rows = dataset.num_rows(), "ingestion complete");

    // ─── 4) land the dataset for the downstream appender ─────────────
    assemble::write_dataset(&dataset, &out_dir)?;

    Ok(())
}
