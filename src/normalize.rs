//! ==============================================================================
//! normalize.rs - raw payloads in, uniform readings out
//! ==============================================================================
//!
//! never fails outward. format problems degrade to an empty batch plus a log
//! line; bad individual values degrade to None. timestamps must match the
//! fixed format exactly (no surrounding whitespace).
//!
//! relationships:
//!     - used by: ingest.rs (between fetch and append)
//!     - reads: domain.rs (RawPayload, TIMESTAMP_FORMAT)
//!
//! ==============================================================================

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{RawPayload, Reading, Record, REQUIRED_FIELDS, TIMESTAMP_FORMAT};

/// turn a fetched payload into a batch sorted by timestamp (nulls last)
pub fn normalize(payload: RawPayload) -> Vec<Reading> {
    let records = match payload {
        RawPayload::Empty => {
            debug!("no data received from source");
            return Vec::new();
        }
        RawPayload::Single(record) => vec![record],
        RawPayload::Batch(records) => records,
        RawPayload::Unexpected(kind) => {
            warn!(got = %kind, "unexpected data format, expected list or object");
            return Vec::new();
        }
    };

    if records.is_empty() {
        debug!("source returned an empty batch");
        return Vec::new();
    }

    for field in REQUIRED_FIELDS {
        if !records.iter().any(|r| r.contains_key(field)) {
            debug!(column = field, "missing column, filling with null");
        }
    }

    let mut rows: Vec<Reading> = records.iter().map(normalize_record).collect();
    rows.sort_by_key(Reading::sort_key);
    rows
}

fn normalize_record(record: &Record) -> Reading {
    Reading {
        timestamp: record.get("timestamp").and_then(parse_timestamp),
        ph: record.get("pH").and_then(parse_number),
        tds: record.get("TDS").and_then(parse_number),
        depth: record.get("Depth").and_then(parse_number),
        flow_ind: record.get("FlowInd").and_then(parse_number),
    }
}

fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?;
    // chrono's numeric fields skip leading whitespace; the format is exact
    if text.trim() != text {
        return None;
    }
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn payload(value: Value) -> RawPayload {
        RawPayload::from_json(value)
    }

    #[test]
    fn empty_and_unexpected_yield_nothing() {
        assert!(normalize(RawPayload::Empty).is_empty());
        assert!(normalize(payload(json!([]))).is_empty());
        assert!(normalize(payload(json!(42))).is_empty());
        assert!(normalize(payload(json!(["a", "b"]))).is_empty());
    }

    #[test]
    fn single_record_becomes_one_row() {
        let rows = normalize(payload(json!({
            "timestamp": "01-Jan-2024 10:00:00",
            "pH": 7.1, "TDS": 300, "Depth": 1.2, "FlowInd": 0.5
        })));
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(
            row.timestamp,
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap())
        );
        assert_eq!(row.ph, Some(7.1));
        assert_eq!(row.tds, Some(300.0));
        assert_eq!(row.depth, Some(1.2));
        assert_eq!(row.flow_ind, Some(0.5));
    }

    #[test]
    fn bad_values_become_null_but_row_is_kept() {
        let rows = normalize(payload(json!([
            {"timestamp": "2024-01-01 10:00", "pH": "abc", "TDS": true},
            {"pH": "6.8", "extra": "ignored"},
            {"timestamp": 1234, "FlowInd": null}
        ])));
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.timestamp.is_none()));
        assert!(rows.iter().any(|r| r.ph == Some(6.8)));
        assert!(rows.iter().all(|r| r.tds.is_none() && r.depth.is_none() && r.flow_ind.is_none()));
    }

    #[test]
    fn batch_is_sorted_with_null_timestamps_last() {
        let rows = normalize(payload(json!([
            {"timestamp": "garbage", "pH": 1.0},
            {"timestamp": "03-Jan-2024 00:00:00", "pH": 3.0},
            {"timestamp": "01-Jan-2024 00:00:00", "pH": 2.0}
        ])));
        let order: Vec<_> = rows.iter().map(|r| r.ph).collect();
        assert_eq!(order, vec![Some(2.0), Some(3.0), Some(1.0)]);
    }

    #[test]
    fn padded_timestamps_do_not_parse() {
        let rows = normalize(payload(json!([
            {"timestamp": " 01-Jan-2024 10:00:00 ", "pH": 1.0},
            {"timestamp": " 01-Jan-2024 10:00:00", "pH": 2.0},
            {"timestamp": "01-Jan-2024 10:00:00\n", "pH": 3.0}
        ])));
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.timestamp.is_none()));
    }

    #[test]
    fn month_abbreviation_is_case_insensitive() {
        let rows = normalize(payload(json!({"timestamp": "15-MAR-2024 23:59:59"})));
        assert_eq!(
            rows[0].timestamp,
            Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(23, 59, 59).unwrap())
        );
    }
}
