// src/fetch/urls.rs
use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Public TLC trip-record archive, one parquet file per (variant, month).
pub static BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";

/// A calendar year-month, the unit the archive publishes files in.
///
/// Orders by (year, month), and renders as `YYYY-MM` — the form the archive
/// embeds in its file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// The month a calendar date falls in; the day is discarded.
    pub fn of(date: NaiveDate) -> Self {
        MonthKey {
            year: date.year(),
            month: date.month(),
        }
    }

    fn next(self) -> Self {
        if self.month == 12 {
            MonthKey {
                year: self.year + 1,
                month: 1,
            }
        } else {
            MonthKey {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Expand a date range into the inclusive, ascending sequence of months it
/// covers. Only the year-month of each endpoint is significant, so
/// 2023-01-15..2023-03-01 yields 2023-01, 2023-02, 2023-03.
pub fn months_in_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<MonthKey>> {
    let first = MonthKey::of(start);
    let last = MonthKey::of(end);
    if first > last {
        bail!("invalid date range: start {} is after end {}", start, end);
    }

    let mut months = Vec::new();
    let mut cursor = first;
    while cursor <= last {
        months.push(cursor);
        cursor = cursor.next();
    }
    Ok(months)
}

/// Resolve the archive address of one monthly file.
pub fn trip_data_url(base: &str, taxi_type: &str, month: MonthKey) -> String {
    format!(
        "{}/{}_tripdata_{}.parquet",
        base.trim_end_matches('/'),
        taxi_type,
        month
    )
}
