//! Live stream targets

use serde::{Deserialize, Serialize};

/// A request for one live log stream
///
/// The cache keys connections by `url` alone: targets that differ only in
/// `query`, `regexp` or `ref_id` share one connection and one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamTarget {
    /// Query text; only its selector labels are used here
    #[serde(default)]
    pub query: String,
    /// Extraction pattern, passed through untouched
    #[serde(default)]
    pub regexp: String,
    /// Connection endpoint and cache key
    pub url: String,
    /// Caller correlation id, passed through untouched
    #[serde(default)]
    pub ref_id: String,
    /// Maximum rows buffered for this stream
    #[serde(alias = "size")]
    pub capacity: usize,
}

impl StreamTarget {
    /// Create a target with empty `regexp` and `ref_id`
    pub fn new(url: impl Into<String>, query: impl Into<String>, capacity: usize) -> Self {
        Self {
            query: query.into(),
            regexp: String::new(),
            url: url.into(),
            ref_id: String::new(),
            capacity,
        }
    }

    /// Set the correlation id
    pub fn ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = ref_id.into();
        self
    }

    /// Set the extraction pattern
    pub fn regexp(mut self, regexp: impl Into<String>) -> Self {
        self.regexp = regexp.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let target = StreamTarget::new("tcp://logs:9000", r#"{job="api"}"#, 100)
            .ref_id("A")
            .regexp("err.*");

        assert_eq!(target.url, "tcp://logs:9000");
        assert_eq!(target.ref_id, "A");
        assert_eq!(target.regexp, "err.*");
        assert_eq!(target.capacity, 100);
    }

    #[test]
    fn test_deserialize_with_size_alias() {
        let json = r#"{"query":"{job=\"api\"}","regexp":"","url":"tcp://l:1","refId":"B","size":50}"#;
        let target: StreamTarget = serde_json::from_str(json).unwrap();

        assert_eq!(target.ref_id, "B");
        assert_eq!(target.capacity, 50);
        assert_eq!(target.query, r#"{job="api"}"#);
    }

    #[test]
    fn test_deserialize_defaults() {
        let target: StreamTarget =
            serde_json::from_str(r#"{"url":"tcp://l:1","capacity":5}"#).unwrap();

        assert!(target.query.is_empty());
        assert!(target.ref_id.is_empty());
    }
}
