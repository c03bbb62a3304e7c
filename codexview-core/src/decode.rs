use serde_json::{Map, Value};
use tracing::warn;

use crate::model::{LogLine, Record, RecordKind};

const DEFAULT_TIMESTAMP: &str = "unknown";

/// Decode every non-blank line of a JSONL log. Line numbers are 1-based and
/// count blank lines too.
pub fn decode_log(raw_jsonl: &str) -> Vec<LogLine> {
    raw_jsonl
        .lines()
        .enumerate()
        .filter_map(|(line_idx, line)| decode_line(line, line_idx + 1))
        .collect()
}

/// Returns `None` for blank lines; malformed lines come back as
/// [`LogLine::Malformed`] instead of failing the load.
pub fn decode_line(line: &str, line_no: usize) -> Option<LogLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(err) => {
            warn!(line = line_no, error = %err, "malformed json line");
            return Some(LogLine::Malformed {
                line_no,
                message: err.to_string(),
            });
        }
    };

    let Value::Object(mut object) = value else {
        warn!(line = line_no, "json line is not an object");
        return Some(LogLine::Malformed {
            line_no,
            message: "expected a JSON object".to_string(),
        });
    };

    let kind = RecordKind::parse(object.get("type").and_then(Value::as_str));
    let timestamp = match object.get("timestamp") {
        None | Some(Value::Null) => DEFAULT_TIMESTAMP.to_string(),
        Some(Value::String(timestamp)) => timestamp.clone(),
        Some(other) => other.to_string(),
    };
    let payload = match object.remove("payload") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(payload) => payload,
    };

    Some(LogLine::Record(Record {
        line_no,
        kind,
        timestamp,
        payload,
    }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::decode::{decode_line, decode_log};
    use crate::model::{LogLine, RecordKind};

    #[test]
    fn blank_lines_are_skipped_but_counted() {
        let raw = "\n   \n{\"type\":\"event_msg\",\"payload\":{}}\n";
        let lines = decode_log(raw);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line_no(), 3);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let line = decode_line("{}", 1).expect("non-blank");
        let record = line.as_record().expect("record");
        assert_eq!(record.kind, RecordKind::Unknown("unknown".to_string()));
        assert_eq!(record.timestamp, "unknown");
        assert_eq!(record.payload, json!({}));
    }

    #[test]
    fn malformed_line_does_not_stop_later_lines() {
        let raw = r#"{"type":"session_meta","timestamp":"t0","payload":{"id":"s"}}
{"type": "event_msg",
{"type":"turn_context","timestamp":"t2","payload":{}}"#;

        let lines = decode_log(raw);
        assert_eq!(lines.len(), 3);
        assert!(matches!(lines[0], LogLine::Record(_)));
        assert!(matches!(lines[1], LogLine::Malformed { line_no: 2, .. }));
        let last = lines[2].as_record().expect("record");
        assert_eq!(last.kind, RecordKind::TurnContext);
        assert_eq!(last.timestamp, "t2");
    }

    #[test]
    fn non_object_json_is_malformed() {
        let line = decode_line("[1, 2]", 7).expect("non-blank");
        match line {
            LogLine::Malformed { line_no, message } => {
                assert_eq!(line_no, 7);
                assert!(message.contains("JSON object"));
            }
            LogLine::Record(_) => panic!("array must not decode as a record"),
        }
    }

    #[test]
    fn non_string_timestamp_uses_json_text() {
        let line = decode_line(r#"{"type":"event_msg","timestamp":17,"payload":null}"#, 1)
            .expect("non-blank");
        let record = line.as_record().expect("record");
        assert_eq!(record.timestamp, "17");
        assert_eq!(record.payload, json!({}));
    }
}
