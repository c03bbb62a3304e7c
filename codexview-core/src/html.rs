//! HTML fragment helpers shared by the entry renderer and the page assembler.
//!
//! Every piece of log content passes through [`escape`] before it is embedded;
//! callers only concatenate fragments produced here.

use serde_json::{Map, Value};

const CODE_FIELDS: &[&str] = &["code", "content", "text"];
const LANGUAGE_FIELDS: &[&str] = &["language", "lang", "programming_language"];

/// Escapes `& < > " '` for use in element content and quoted attributes.
pub fn escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            _ => output.push(c),
        }
    }
    output
}

/// Plain text of a JSON value: strings verbatim, everything else as compact JSON.
pub fn plain_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Escaped text with newlines turned into `<br>`.
pub fn text_block(text: &str) -> String {
    escape(text).replace('\n', "<br>")
}

pub fn pre(text: &str) -> String {
    format!("<pre>{}</pre>", escape(text))
}

/// Pretty-printed JSON in a `<pre>`, optionally folded into a `<details>`.
pub fn payload_block(payload: &Value, collapsed: bool) -> String {
    let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    let block = pre(&pretty);
    if collapsed {
        format!("<details><summary>Show payload</summary>{block}</details>")
    } else {
        block
    }
}

/// Decodes a JSON-carrying field. Structured values pass through; strings are
/// parsed; blank strings, non-JSON strings and `null` yield `None`.
pub fn parse_embedded_json(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::Object(_) | Value::Array(_) => return Some(value.clone()),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            serde_json::from_str::<Value>(text).ok()?
        }
        _ => return None,
    };

    (!parsed.is_null()).then_some(parsed)
}

/// Recursive key/value rendering of an arbitrary JSON tree.
pub fn structured(value: &Value) -> String {
    match value {
        Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("code") => {
            code_block(map)
        }
        Value::Object(map) => {
            let rows = map
                .iter()
                .map(|(key, value)| {
                    format!(
                        "<tr><th>{}</th><td>{}</td></tr>",
                        escape(key),
                        structured(value)
                    )
                })
                .collect::<String>();
            format!("<table class=\"kv-table\">{rows}</table>")
        }
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| format!("<li>{}</li>", structured(item)))
                .collect::<String>();
            format!("<ul class=\"list-nested\">{items}</ul>")
        }
        scalar => render_scalar(scalar),
    }
}

pub fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => "<em>null</em>".to_string(),
        Value::String(text) if text.contains('\n') => pre(text),
        other => format!("<span>{}</span>", escape(&plain_text(other))),
    }
}

fn code_block(node: &Map<String, Value>) -> String {
    let code = first_truthy(node, CODE_FIELDS)
        .map(plain_text)
        .unwrap_or_default();
    let header = first_truthy(node, LANGUAGE_FIELDS)
        .map(|language| {
            format!(
                "<div class=\"code-lang\">{}</div>",
                escape(&plain_text(language))
            )
        })
        .unwrap_or_default();

    format!(
        "<div class=\"code-block\">{header}<pre><code>{}</code></pre></div>",
        escape(&code)
    )
}

fn first_truthy<'a>(node: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| node.get(*key))
        .find(|value| is_truthy(value))
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
