//! ==============================================================================
//! domain.rs - readings and raw upstream payloads
//! ==============================================================================
//!
//! purpose:
//!     the two shapes data takes inside the hub:
//!     - RawPayload: whatever json the upstream source handed back, classified
//!     - Reading: one normalized row of the data store
//!
//! relationships:
//!     - produced by: fetcher.rs (RawPayload), normalize.rs (Reading)
//!     - stored by: store.rs
//!     - serialized by: server.rs (Reading goes out verbatim in `data`)
//!
//! ==============================================================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// textual timestamp format used by the upstream source, e.g. "01-Jan-2024 10:00:00"
pub const TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// the five columns every reading carries, in output order
pub const REQUIRED_FIELDS: [&str; 5] = ["timestamp", "pH", "TDS", "Depth", "FlowInd"];

/// one upstream record, before normalization
pub type Record = Map<String, Value>;

/// one normalized sensor observation
///
/// every field is always present; anything missing or unparseable upstream
/// is carried as `None` and serialized as json `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// local wall-clock time of the observation
    pub timestamp: Option<NaiveDateTime>,
    #[serde(rename = "pH")]
    pub ph: Option<f64>,
    #[serde(rename = "TDS")]
    pub tds: Option<f64>,
    #[serde(rename = "Depth")]
    pub depth: Option<f64>,
    #[serde(rename = "FlowInd")]
    pub flow_ind: Option<f64>,
}

impl Reading {
    /// sort key: ascending by time, null timestamps last
    pub fn sort_key(&self) -> (bool, Option<NaiveDateTime>) {
        (self.timestamp.is_none(), self.timestamp)
    }

    /// hashable identity for full-row de-duplication
    ///
    /// floats are keyed by bit pattern with -0.0 folded onto 0.0 so the key
    /// agrees with `PartialEq`.
    pub fn dedup_key(&self) -> ReadingKey {
        fn bits(v: Option<f64>) -> Option<u64> {
            v.map(|x| if x == 0.0 { 0 } else { x.to_bits() })
        }
        ReadingKey {
            timestamp: self.timestamp,
            values: [bits(self.ph), bits(self.tds), bits(self.depth), bits(self.flow_ind)],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReadingKey {
    timestamp: Option<NaiveDateTime>,
    values: [Option<u64>; 4],
}

/// decoded upstream response, classified at the fetcher boundary
///
/// the normalizer matches on this exhaustively instead of poking at json types.
#[derive(Clone, Debug, PartialEq)]
pub enum RawPayload {
    /// nothing usable: transport failure, `null`, or `{}`
    Empty,
    /// a bare object, treated as a one-element batch
    Single(Record),
    /// a list of objects (possibly empty)
    Batch(Vec<Record>),
    /// valid json of the wrong shape; carries a short description of what arrived
    Unexpected(String),
}

impl RawPayload {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => RawPayload::Empty,
            Value::Object(map) if map.is_empty() => RawPayload::Empty,
            Value::Object(map) => RawPayload::Single(map),
            Value::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(map) => records.push(map),
                        other => {
                            return RawPayload::Unexpected(format!(
                                "list containing {}",
                                json_kind(&other)
                            ))
                        }
                    }
                }
                RawPayload::Batch(records)
            }
            other => RawPayload::Unexpected(json_kind(&other).to_string()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
