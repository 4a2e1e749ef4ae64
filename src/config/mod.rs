// src/config/mod.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Variants fetched when the orchestrator does not name any.
pub static DEFAULT_TAXI_TYPES: &[&str] = &["yellow", "green"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inputs for one ingestion run, supplied by the orchestration layer.
///
/// Passed in explicitly rather than read from ambient process state so tests
/// can drive arbitrary ranges and variant lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Source variants to fetch, in the order their rows should appear.
    pub taxi_types: Vec<String>,
}

impl IngestConfig {
    /// Build a config from the orchestrator's string inputs. Dates must be
    /// `YYYY-MM-DD`; a missing or malformed date aborts the run before any
    /// fetch happens.
    pub fn new(start: &str, end: &str, taxi_types: Vec<String>) -> Result<Self> {
        let start_date = NaiveDate::parse_from_str(start, DATE_FORMAT)
            .with_context(|| format!("invalid start date `{}`, expected YYYY-MM-DD", start))?;
        let end_date = NaiveDate::parse_from_str(end, DATE_FORMAT)
            .with_context(|| format!("invalid end date `{}`, expected YYYY-MM-DD", end))?;
        Ok(IngestConfig {
            start_date,
            end_date,
            taxi_types,
        })
    }

    /// Read the run inputs from the environment the orchestrator sets:
    /// `INGEST_START_DATE` and `INGEST_END_DATE` are required,
    /// `INGEST_TAXI_TYPES` is an optional JSON string array (the orchestrator
    /// hands variables through as JSON) defaulting to yellow + green.
    pub fn from_env() -> Result<Self> {
        let start = std::env::var("INGEST_START_DATE").context("INGEST_START_DATE must be set")?;
        let end = std::env::var("INGEST_END_DATE").context("INGEST_END_DATE must be set")?;
        let taxi_types = match std::env::var("INGEST_TAXI_TYPES") {
            Ok(raw) => serde_json::from_str::<Vec<String>>(&raw)
                .with_context(|| format!("parsing INGEST_TAXI_TYPES `{}`", raw))?,
            Err(_) => DEFAULT_TAXI_TYPES.iter().map(|s| s.to_string()).collect(),
        };
        Self::new(&start, &end, taxi_types)
    }
}
