use serde::Deserialize;
use serde_json::Value;

use crate::html::{parse_embedded_json, plain_text};
use crate::model::{LogLine, Record, RecordKind, UploadSnapshot};

pub const DEFAULT_UPLOAD_FUNCTION: &str = "mcp__kernelmcp__vm_compile_c_and_upload";

#[derive(Debug, Deserialize)]
struct UploadArguments {
    #[serde(default)]
    code: Value,
    #[serde(default)]
    flags: Value,
}

/// Collect every call to `function_name` in file order, numbering from 1.
pub fn extract_uploads(lines: &[LogLine], function_name: &str) -> Vec<UploadSnapshot> {
    let mut uploads = Vec::new();

    for record in lines.iter().filter_map(LogLine::as_record) {
        let Some(arguments) = matching_arguments(record, function_name) else {
            continue;
        };

        uploads.push(UploadSnapshot {
            index: uploads.len() + 1,
            timestamp: record.timestamp.clone(),
            line_no: record.line_no,
            code: coerce_text(&arguments.code),
            flags: coerce_flags(&arguments.flags),
        });
    }

    uploads
}

fn matching_arguments(record: &Record, function_name: &str) -> Option<UploadArguments> {
    if record.kind != RecordKind::ResponseItem || record.subtype() != Some("function_call") {
        return None;
    }
    if record.payload.get("name").and_then(Value::as_str) != Some(function_name) {
        return None;
    }

    let parsed = parse_embedded_json(record.payload.get("arguments")?)?;
    if !parsed.is_object() {
        return None;
    }
    serde_json::from_value(parsed).ok()
}

fn coerce_text(value: &Value) -> String {
    if value.is_null() {
        String::new()
    } else {
        plain_text(value)
    }
}

fn coerce_flags(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(plain_text).collect::<Vec<_>>().join("\n"),
        other => coerce_text(other),
    }
}
