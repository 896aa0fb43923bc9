//! Push-message wire format
//!
//! A message is one JSON document carrying one or more label streams, each
//! with its own entries:
//!
//! ```json
//! {
//!   "streams": [
//!     { "labels": "{job=\"api\"}",
//!       "entries": [ { "ts": "2019-11-21T10:00:00.123Z", "line": "GET /" } ] }
//!   ],
//!   "dropped_entries": [ { "labels": "{job=\"api\"}", "timestamp": "..." } ]
//! }
//! ```

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Deserialize;

use super::error::MalformedMessage;

/// Top-level push message
#[derive(Debug, Deserialize)]
pub struct PushMessage {
    /// Label streams, in arrival order
    pub streams: Vec<PushStream>,
    /// Entries the server discarded before sending
    #[serde(default)]
    pub dropped_entries: Vec<serde_json::Value>,
}

/// Entries sharing one label set
#[derive(Debug, Deserialize)]
pub struct PushStream {
    /// Per-line labels for every entry of this stream
    #[serde(default)]
    pub labels: Option<WireLabels>,
    /// Log entries, in arrival order
    pub entries: Vec<PushEntry>,
}

/// Labels either as a selector string or as a plain object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WireLabels {
    /// `{k="v", ...}` selector text
    Selector(String),
    /// `{"k": "v", ...}` object
    Map(BTreeMap<String, String>),
}

/// One log line
#[derive(Debug, Deserialize)]
pub struct PushEntry {
    /// Timestamp; absent means "use the arrival time"
    #[serde(default, alias = "timestamp")]
    pub ts: Option<WireTimestamp>,
    /// Raw log text
    pub line: String,
}

/// Timestamp as sent on the wire
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    /// Epoch milliseconds
    Millis(i64),
    /// RFC 3339 text, or epoch milliseconds as a string
    Text(String),
}

impl WireTimestamp {
    /// Convert to epoch milliseconds
    pub fn to_millis(&self) -> Result<i64, MalformedMessage> {
        match self {
            WireTimestamp::Millis(ms) => Ok(*ms),
            WireTimestamp::Text(text) => {
                if let Ok(ms) = text.parse::<i64>() {
                    return Ok(ms);
                }
                DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.timestamp_millis())
                    .map_err(|e| MalformedMessage::new(format!("bad timestamp {:?}: {}", text, e)))
            }
        }
    }
}

impl PushMessage {
    /// Decode a raw payload
    pub fn decode(payload: &[u8]) -> Result<Self, MalformedMessage> {
        Ok(serde_json::from_slice(payload)?)
    }
}
