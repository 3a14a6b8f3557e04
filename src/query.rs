//! ==============================================================================
//! query.rs - date-window slices over a sorted row set
//! ==============================================================================
//!
//! everything here is pure. callers pass the reference date explicitly; the
//! store supplies the process-local "today" when serving requests.
//!
//! relationships:
//!     - used by: store.rs (under the read lock), server.rs (date parsing)
//!
//! ==============================================================================

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::domain::Reading;

/// date format accepted from callers and echoed back in `date_range`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid range_type. Use 'last_7_days' or 'last_30_days'")]
    InvalidRangeType(String),
    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDate(String),
}

/// caller-facing shorthand windows ending today
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedRange {
    Last7Days,
    Last30Days,
}

impl NamedRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamedRange::Last7Days => "last_7_days",
            NamedRange::Last30Days => "last_30_days",
        }
    }

    fn days(&self) -> i64 {
        match self {
            NamedRange::Last7Days => 7,
            NamedRange::Last30Days => 30,
        }
    }

    /// concrete inclusive interval `[today - n days, today]`
    pub fn window(&self, today: NaiveDate) -> DateRange {
        DateRange { start: today - Duration::days(self.days()), end: today }
    }
}

impl FromStr for NamedRange {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_7_days" => Ok(NamedRange::Last7Days),
            "last_30_days" => Ok(NamedRange::Last30Days),
            other => Err(QueryError::InvalidRangeType(other.to_string())),
        }
    }
}

impl fmt::Display for NamedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// inclusive calendar-date interval; serialized as `{start, end}` in YYYY-MM-DD
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(serialize_with = "ser_date")]
    pub start: NaiveDate,
    #[serde(serialize_with = "ser_date")]
    pub end: NaiveDate,
}

fn ser_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format(DATE_FORMAT))
}

/// parse a caller-supplied YYYY-MM-DD date
pub fn parse_date(text: &str) -> Result<NaiveDate, QueryError> {
    if text.trim() != text {
        return Err(QueryError::InvalidDate(text.to_string()));
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|_| QueryError::InvalidDate(text.to_string()))
}

/// rows whose timestamp date lies in `[start, end]`; empty when `start > end`
pub fn range(rows: &[Reading], start: NaiveDate, end: NaiveDate) -> Vec<Reading> {
    if start > end {
        return Vec::new();
    }
    rows.iter()
        .filter(|r| match r.timestamp {
            Some(ts) => {
                let day = ts.date();
                day >= start && day <= end
            }
            None => false,
        })
        .cloned()
        .collect()
}

pub fn by_date(rows: &[Reading], date: NaiveDate) -> Vec<Reading> {
    range(rows, date, date)
}

pub fn today(rows: &[Reading], today: NaiveDate) -> Vec<Reading> {
    by_date(rows, today)
}

pub fn named_range(rows: &[Reading], kind: NamedRange, today: NaiveDate) -> Vec<Reading> {
    let window = kind.window(today);
    range(rows, window.start, window.end)
}
