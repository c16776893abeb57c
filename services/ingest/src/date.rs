//! Record date from a file name
//!
//! The first run of exactly eight consecutive digits is read as `YYYYMMDD`.
//! Longer or shorter digit runs are skipped. A name without such a run, or
//! whose run is not a real calendar date, yields `None`.
//!
//! Note: the run must be exactly eight digits. Taking the first eight digits
//! of a longer run would date `fcr_202401151.xlsx` as 2024-01-15; here that
//! name has no date.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

const DATE_FORMAT: &str = "%Y%m%d";

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("Invalid regex"));

fn first_eight_digit_run(filename: &str) -> Option<&str> {
    DIGIT_RUN
        .find_iter(filename)
        .map(|m| m.as_str())
        .find(|digits| digits.len() == 8)
}

pub fn extract_date(filename: &str) -> Option<NaiveDate> {
    let parsed = first_eight_digit_run(filename)
        .and_then(|digits| NaiveDate::parse_from_str(digits, DATE_FORMAT).ok());
    if parsed.is_none() {
        warn!(file = %filename, "could not parse date from filename");
    }
    parsed
}
