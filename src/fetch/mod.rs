// src/fetch/mod.rs

pub mod files;
pub mod urls;

pub use files::fetch_trip_file;
pub use urls::{months_in_range, trip_data_url, MonthKey, BASE_URL};
