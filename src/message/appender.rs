//! Push message → frame rows
//!
//! The whole payload is decoded and validated before the frame is touched,
//! so a malformed message never leaves a partial append behind.

use super::error::MalformedMessage;
use super::labels::LabelParser;
use super::wire::{PushMessage, WireLabels};
use crate::frame::{Labels, LogFrame, LogRow};

/// Outcome of applying one message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    /// Rows appended to the frame
    pub rows: usize,
    /// Entries the server reported as dropped
    pub dropped: usize,
}

/// Decode `payload` into rows without touching any frame
///
/// `base` are the frame-level labels; stream labels override them key by
/// key. Entries without a timestamp get `received_at` (epoch ms).
pub fn decode_rows(
    payload: &[u8],
    base: &Labels,
    parser: &dyn LabelParser,
    received_at: i64,
) -> Result<(Vec<LogRow>, usize), MalformedMessage> {
    let message = PushMessage::decode(payload)?;
    let mut rows = Vec::new();

    for stream in &message.streams {
        let mut labels = base.clone();
        match &stream.labels {
            Some(WireLabels::Selector(text)) => {
                let parsed = parser
                    .parse(text)
                    .map_err(|e| MalformedMessage::new(format!("bad stream labels: {}", e)))?;
                labels.extend(parsed);
            }
            Some(WireLabels::Map(map)) => {
                labels.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            None => {}
        }

        for entry in &stream.entries {
            let time = match &entry.ts {
                Some(ts) => ts.to_millis()?,
                None => received_at,
            };
            rows.push(LogRow::new(time, entry.line.clone(), labels.clone()));
        }
    }

    Ok((rows, message.dropped_entries.len()))
}

/// Decode `payload` and append every resulting row to `frame`
///
/// On error the frame is left exactly as it was.
pub fn apply_message(
    payload: &[u8],
    frame: &mut LogFrame,
    parser: &dyn LabelParser,
    received_at: i64,
) -> Result<Applied, MalformedMessage> {
    let (rows, dropped) = decode_rows(payload, frame.labels(), parser, received_at)?;
    let count = rows.len();

    for row in rows {
        frame.append(row);
    }

    Ok(Applied {
        rows: count,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::SelectorParser;

    fn frame(capacity: usize) -> LogFrame {
        let labels = SelectorParser.parse(r#"{job="api"}"#).unwrap();
        LogFrame::new(capacity, labels).unwrap()
    }

    fn msg(line: &str, ts: i64) -> Vec<u8> {
        format!(
            r#"{{"streams":[{{"labels":"{{job=\"api\"}}","entries":[{{"ts":"{}","line":"{}"}}]}}]}}"#,
            ts, line
        )
        .into_bytes()
    }

    #[test]
    fn test_capacity_three_scenario() {
        let mut frame = frame(3);
        let mut sizes = Vec::new();

        for (line, ts) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            let applied = apply_message(&msg(line, ts), &mut frame, &SelectorParser, 0).unwrap();
            assert_eq!(applied.rows, 1);
            sizes.push(frame.snapshot().len());
        }

        assert_eq!(sizes, [1, 2, 3, 3]);
        let lines: Vec<_> = frame.iter().map(|r| r.line.as_str()).collect();
        assert_eq!(lines, ["b", "c", "d"]);
        assert!(frame.iter().all(|r| r.labels["job"] == "api"));
        let times: Vec<_> = frame.iter().map(|r| r.time).collect();
        assert_eq!(times, [2, 3, 4]);
    }

    #[test]
    fn test_multiple_streams_and_entries() {
        let payload = br#"{"streams":[
            {"labels":{"level":"info"},"entries":[{"ts":1,"line":"a"},{"ts":2,"line":"b"}]},
            {"labels":{"level":"warn"},"entries":[{"ts":3,"line":"c"}]}
        ]}"#;
        let mut frame = frame(10);

        let applied = apply_message(payload, &mut frame, &SelectorParser, 0).unwrap();

        assert_eq!(applied.rows, 3);
        let levels: Vec<_> = frame.iter().map(|r| r.labels["level"].as_str()).collect();
        assert_eq!(levels, ["info", "info", "warn"]);
    }

    #[test]
    fn test_per_line_labels_override_base() {
        let payload = br#"{"streams":[{"labels":"{job=\"worker\", pod=\"p1\"}","entries":[{"ts":1,"line":"x"}]}]}"#;
        let mut frame = frame(2);

        apply_message(payload, &mut frame, &SelectorParser, 0).unwrap();

        let row = frame.iter().next().unwrap();
        assert_eq!(row.labels["job"], "worker");
        assert_eq!(row.labels["pod"], "p1");
        // Frame defaults are untouched
        assert_eq!(frame.labels()["job"], "api");
    }

    #[test]
    fn test_base_labels_fill_in_without_stream_labels() {
        let payload = br#"{"streams":[{"entries":[{"ts":1,"line":"x"}]}]}"#;
        let mut frame = frame(2);

        apply_message(payload, &mut frame, &SelectorParser, 0).unwrap();

        assert_eq!(frame.iter().next().unwrap().labels["job"], "api");
    }

    #[test]
    fn test_missing_timestamp_uses_arrival_time() {
        let payload = br#"{"streams":[{"entries":[{"line":"x"}]}]}"#;
        let mut frame = frame(2);

        apply_message(payload, &mut frame, &SelectorParser, 1_700_000_000_000).unwrap();

        assert_eq!(frame.iter().next().unwrap().time, 1_700_000_000_000);
    }

    #[test]
    fn test_replayed_message_has_same_ids() {
        let mut first = frame(4);
        let mut second = frame(4);

        apply_message(&msg("hello", 10), &mut first, &SelectorParser, 0).unwrap();
        apply_message(&msg("hello", 10), &mut second, &SelectorParser, 99).unwrap();

        let a = first.iter().next().unwrap();
        let b = second.iter().next().unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_one_label_difference_changes_id() {
        let a = br#"{"streams":[{"labels":{"pod":"p1"},"entries":[{"ts":1,"line":"x"}]}]}"#;
        let b = br#"{"streams":[{"labels":{"pod":"p2"},"entries":[{"ts":1,"line":"x"}]}]}"#;
        let mut frame = frame(4);

        apply_message(a, &mut frame, &SelectorParser, 0).unwrap();
        apply_message(b, &mut frame, &SelectorParser, 0).unwrap();

        let ids: Vec<_> = frame.iter().map(|r| r.id.clone()).collect();
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_malformed_message_leaves_frame_untouched() {
        let mut frame = frame(4);
        apply_message(&msg("a", 1), &mut frame, &SelectorParser, 0).unwrap();

        // Second entry lacks a line: nothing from this message may land
        let bad = br#"{"streams":[{"entries":[{"ts":2,"line":"b"},{"ts":3}]}]}"#;
        assert!(apply_message(bad, &mut frame, &SelectorParser, 0).is_err());

        let bad_labels = br#"{"streams":[{"labels":"{job=","entries":[{"ts":2,"line":"b"}]}]}"#;
        assert!(apply_message(bad_labels, &mut frame, &SelectorParser, 0).is_err());

        let bad_ts = br#"{"streams":[{"entries":[{"ts":"soon","line":"b"}]}]}"#;
        assert!(apply_message(bad_ts, &mut frame, &SelectorParser, 0).is_err());

        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn test_malformed_between_wellformed() {
        let mut frame = frame(4);

        assert!(apply_message(&msg("a", 1), &mut frame, &SelectorParser, 0).is_ok());
        assert!(apply_message(b"garbage", &mut frame, &SelectorParser, 0).is_err());
        assert!(apply_message(&msg("b", 2), &mut frame, &SelectorParser, 0).is_ok());

        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_dropped_entries_counted_not_appended() {
        let payload = br#"{"streams":[],"dropped_entries":[{"labels":"{}","timestamp":"1"},{"labels":"{}","timestamp":"2"}]}"#;
        let mut frame = frame(4);

        let applied = apply_message(payload, &mut frame, &SelectorParser, 0).unwrap();

        assert_eq!(applied, Applied { rows: 0, dropped: 2 });
        assert!(frame.is_empty());
    }
}
