//! Calendar helpers for day-scoped keys and metric windows
//!
//! All dates are plain calendar days (`NaiveDate`) rendered as `YYYY-MM-DD`.

use crate::error::Result;
use chrono::{Datelike, Duration, NaiveDate};

/// Format used for date-scoped store keys and CLI arguments
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)?)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Every day from `start` through `end`, inclusive; empty when `start > end`
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Sunday on or before `date`
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// The `days`-long window ending on `end`, inclusive
pub fn window_ending(end: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let span = days.saturating_sub(1) as i64;
    (end - Duration::days(span), end)
}
