pub mod assemble;
pub mod config;
pub mod fetch;
pub mod schema;

pub use assemble::{concat_aligned, ingest, run_ingest};
pub use config::IngestConfig;
