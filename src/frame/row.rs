//! Row types stored in frames

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::field::{Field, FieldType, Labels};

/// A row type with a fixed column schema
pub trait Row {
    /// Ordered column descriptors; the same for every row of the type
    fn fields() -> &'static [Field];
}

/// Column schema of a log row. Reordering is a breaking change for consumers.
static LOG_FIELDS: [Field; 4] = [
    Field::new("time", FieldType::Time).titled("Time"),
    Field::new("line", FieldType::String),
    Field::new("labels", FieldType::Other),
    Field::new("id", FieldType::String),
];

/// One buffered log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    /// Timestamp in epoch milliseconds
    pub time: i64,
    /// Raw log text
    pub line: String,
    /// Effective labels (frame defaults overlaid by per-line labels)
    pub labels: Labels,
    /// Content-derived identity, stable across replays
    ///
    /// Process-local: ids agree within one build of the crate, but the hash
    /// algorithm may change between Rust releases, so never persist them.
    pub id: String,
}

impl LogRow {
    /// Build a row, deriving its id from the content
    pub fn new(time: i64, line: impl Into<String>, labels: Labels) -> Self {
        let line = line.into();
        let id = row_id(time, &line, &labels);
        Self {
            time,
            line,
            labels,
            id,
        }
    }
}

impl Row for LogRow {
    fn fields() -> &'static [Field] {
        &LOG_FIELDS
    }
}

/// Deterministic identity for a `(time, line, labels)` triple
///
/// `DefaultHasher::new()` uses fixed keys, so the same content always maps to
/// the same id within a build. Labels iterate in key order. The digest is not
/// stable across toolchains; compare ids only within one process.
pub fn row_id(time: i64, line: &str, labels: &Labels) -> String {
    let mut hasher = DefaultHasher::new();
    time.hash(&mut hasher);
    line.hash(&mut hasher);
    for (key, value) in labels {
        key.hash(&mut hasher);
        value.hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_schema_order() {
        let names: Vec<_> = LogRow::fields().iter().map(|f| f.name).collect();
        assert_eq!(names, ["time", "line", "labels", "id"]);
        assert_eq!(LogRow::fields()[0].field_type, FieldType::Time);
        assert_eq!(LogRow::fields()[0].title, Some("Time"));
    }

    #[test]
    fn test_id_is_deterministic() {
        let a = LogRow::new(1, "hello", labels(&[("job", "api")]));
        let b = LogRow::new(1, "hello", labels(&[("job", "api")]));
        assert_eq!(a.id, b.id);
        assert_eq!(a.id.len(), 16);
    }

    #[test]
    fn test_id_depends_on_every_column() {
        let base = LogRow::new(1, "hello", labels(&[("job", "api")]));

        assert_ne!(base.id, LogRow::new(2, "hello", labels(&[("job", "api")])).id);
        assert_ne!(base.id, LogRow::new(1, "hello!", labels(&[("job", "api")])).id);
        assert_ne!(base.id, LogRow::new(1, "hello", labels(&[("job", "web")])).id);
        assert_ne!(
            base.id,
            LogRow::new(1, "hello", labels(&[("job", "api"), ("level", "info")])).id
        );
    }

    #[test]
    fn test_id_ignores_label_insertion_order() {
        let mut first = Labels::new();
        first.insert("b".into(), "2".into());
        first.insert("a".into(), "1".into());
        let second = labels(&[("a", "1"), ("b", "2")]);

        assert_eq!(row_id(5, "x", &first), row_id(5, "x", &second));
    }

    #[test]
    fn test_id_is_process_local_hex() {
        let row = LogRow::new(7, "hello", labels(&[("job", "api")]));
        assert!(row.id.chars().all(|c| c.is_ascii_hexdigit()));

        // Independent hashers on other threads agree within the process
        let line = row.line.clone();
        let row_labels = row.labels.clone();
        let from_thread = std::thread::spawn(move || row_id(7, &line, &row_labels))
            .join()
            .unwrap();
        assert_eq!(row.id, from_thread);
    }
}
