use serde_json::Value;

use crate::html::{self, escape, is_truthy, plain_text};
use crate::model::{Entry, EntryStyle, EntryTag, LogLine, Record, RecordKind};

const PLAN_FUNCTION: &str = "update_plan";
const TEXT_CHUNK_TYPES: &[&str] = &["input_text", "output_text"];
const NO_SUMMARY_PLACEHOLDER: &str = "<em>No public summary (content encrypted)</em>";
const NO_OUTPUT_PLACEHOLDER: &str = "<em>no output</em>";

enum ResponseItemKind<'a> {
    Message,
    FunctionCall,
    FunctionCallOutput,
    Reasoning,
    Other(Option<&'a str>),
}

impl<'a> ResponseItemKind<'a> {
    fn parse(subtype: Option<&'a str>) -> Self {
        match subtype {
            Some("message") => Self::Message,
            Some("function_call") => Self::FunctionCall,
            Some("function_call_output") => Self::FunctionCallOutput,
            Some("reasoning") => Self::Reasoning,
            other => Self::Other(other),
        }
    }
}

enum EventKind<'a> {
    UserMessage,
    AgentMessage,
    TokenCount,
    Other(Option<&'a str>),
}

impl<'a> EventKind<'a> {
    fn parse(subtype: Option<&'a str>) -> Self {
        match subtype {
            Some("user_message") => Self::UserMessage,
            Some("agent_message") => Self::AgentMessage,
            Some("token_count") => Self::TokenCount,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanStatus {
    InProgress,
    Pending,
    Completed,
    Error,
    Other,
}

impl PlanStatus {
    fn parse(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_lowercase()
            .replace([' ', '-'], "_");
        match normalized.as_str() {
            "in_progress" => Self::InProgress,
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Other,
        }
    }

    fn css_class(self) -> &'static str {
        match self {
            Self::InProgress => "status-in_progress",
            Self::Pending => "status-pending",
            Self::Completed => "status-completed",
            Self::Error => "status-error",
            Self::Other => "status-other",
        }
    }
}

/// Render every decoded line, keeping file order. Suppressed records leave no gap.
pub fn render_entries(lines: &[LogLine]) -> Vec<Entry> {
    lines.iter().filter_map(render_line).collect()
}

pub fn render_line(line: &LogLine) -> Option<Entry> {
    match line {
        LogLine::Record(record) => render_record(record),
        LogLine::Malformed { line_no, message } => Some(Entry {
            timestamp: "n/a".to_string(),
            label: "Malformed JSON".to_string(),
            body_html: html::pre(message),
            style: EntryStyle::Error,
            raw_type: "error".to_string(),
            line_no: *line_no,
            tags: Vec::new(),
        }),
    }
}

/// Map one record to at most one timeline entry.
pub fn render_record(record: &Record) -> Option<Entry> {
    match &record.kind {
        RecordKind::SessionMeta => Some(new_entry(
            record,
            "Session metadata",
            html::payload_block(&record.payload, true),
            EntryStyle::System,
            "session_meta",
        )),
        RecordKind::TurnContext => Some(
            new_entry(
                record,
                "Turn context",
                html::payload_block(&record.payload, true),
                EntryStyle::System,
                "turn_context",
            )
            .tagged(EntryTag::CollapsibleMeta),
        ),
        RecordKind::ResponseItem => render_response_item(record),
        RecordKind::EventMsg => Some(render_event_msg(record)),
        RecordKind::Unknown(raw_type) => Some(new_entry(
            record,
            format!("Unhandled type: {raw_type}"),
            html::payload_block(&record.payload, false),
            EntryStyle::System,
            raw_type.clone(),
        )),
    }
}

fn render_response_item(record: &Record) -> Option<Entry> {
    let payload = &record.payload;

    match ResponseItemKind::parse(record.subtype()) {
        ResponseItemKind::Message => render_message(record),
        ResponseItemKind::FunctionCall => Some(render_function_call(record)),
        ResponseItemKind::FunctionCallOutput => {
            let call_id = field_text(payload, "call_id", "n/a");
            let output = payload.get("output").unwrap_or(&Value::Null);
            let output_html = match html::parse_embedded_json(output) {
                Some(parsed) => html::structured(&parsed),
                None if output.is_null() => NO_OUTPUT_PLACEHOLDER.to_string(),
                None => html::render_scalar(output),
            };
            let body = format!(
                "<div><strong>call_id:</strong> {}</div>{output_html}",
                escape(&call_id)
            );
            Some(new_entry(
                record,
                "Function output",
                body,
                EntryStyle::Tool,
                "response_item/function_call_output",
            ))
        }
        ResponseItemKind::Reasoning => Some(
            new_entry(
                record,
                "Reasoning note",
                render_reasoning_summary(payload.get("summary")),
                EntryStyle::Assistant,
                "response_item/reasoning",
            )
            .tagged(EntryTag::CollapsibleMeta),
        ),
        ResponseItemKind::Other(subtype) => Some(new_entry(
            record,
            format!("Response item ({})", subtype.unwrap_or("unknown")),
            html::payload_block(payload, false),
            EntryStyle::System,
            "response_item/unknown",
        )),
    }
}

fn render_message(record: &Record) -> Option<Entry> {
    let payload = &record.payload;
    let chunks = extract_text_chunks(payload.get("content"));
    if chunks.is_empty() {
        return None;
    }

    let role = field_text(payload, "role", "n/a");
    let style = if role == "user" {
        EntryStyle::User
    } else {
        EntryStyle::Assistant
    };
    let body = chunks
        .iter()
        .map(|chunk| html::text_block(chunk))
        .collect::<Vec<_>>()
        .join("<hr>");

    Some(new_entry(
        record,
        format!("Message · {role}"),
        body,
        style,
        "response_item/message",
    ))
}

fn extract_text_chunks(content: Option<&Value>) -> Vec<&str> {
    content
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|item| {
            item.get("type")
                .and_then(Value::as_str)
                .is_some_and(|item_type| TEXT_CHUNK_TYPES.contains(&item_type))
        })
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .collect()
}

fn render_function_call(record: &Record) -> Entry {
    let payload = &record.payload;
    let name = field_text(payload, "name", "unknown");
    let call_id = field_text(payload, "call_id", "n/a");
    let arguments = payload.get("arguments").unwrap_or(&Value::Null);
    let parsed = html::parse_embedded_json(arguments);

    let mut body = format!(
        "<div><strong>Call:</strong> {}</div><div><strong>call_id:</strong> {}</div>",
        escape(&name),
        escape(&call_id)
    );

    if name == PLAN_FUNCTION
        && let Some(board) = parsed.as_ref().and_then(render_plan_board)
    {
        body.push_str(&board);
    }

    match parsed {
        Some(parsed) => body.push_str(&html::structured(&parsed)),
        None if is_truthy(arguments) => body.push_str(&html::pre(&plain_text(arguments))),
        None => {}
    }

    new_entry(
        record,
        "Function call",
        body,
        EntryStyle::Tool,
        "response_item/function_call",
    )
}

fn render_plan_board(arguments: &Value) -> Option<String> {
    let steps = arguments.get("plan")?.as_array()?;

    let items = steps
        .iter()
        .filter(|step| step.is_object())
        .map(|step| {
            let status = field_text(step, "status", "unknown");
            let chip = PlanStatus::parse(&status);
            let step_text = field_text(step, "step", "");
            format!(
                "<li><span class=\"status-chip {}\">{}</span><span>{}</span></li>",
                chip.css_class(),
                escape(&status.replace('_', " ")),
                escape(&step_text)
            )
        })
        .collect::<Vec<_>>();

    if items.is_empty() {
        return None;
    }

    let explanation = arguments
        .get("explanation")
        .filter(|value| is_truthy(value))
        .map(|value| format!("<p>{}</p>", escape(&plain_text(value))))
        .unwrap_or_default();

    Some(format!(
        "<section class=\"plan-board\"><h4>Plan</h4>{explanation}<ol>{}</ol></section>",
        items.concat()
    ))
}

fn render_reasoning_summary(summary: Option<&Value>) -> String {
    let items = match summary {
        Some(value) if !is_truthy(value) => return NO_SUMMARY_PLACEHOLDER.to_string(),
        None => return NO_SUMMARY_PLACEHOLDER.to_string(),
        Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
        Some(single) => vec![single],
    };

    let rendered = items
        .into_iter()
        .map(|item| format!("<li>{}</li>", render_summary_item(item)))
        .collect::<String>();
    format!("<ul>{rendered}</ul>")
}

fn render_summary_item(item: &Value) -> String {
    if let Some(kind) = item.get("type").and_then(Value::as_str)
        && let Some(text) = item.get("text").filter(|text| !text.is_null())
    {
        return format!(
            "<strong>{}</strong>: {}",
            escape(kind),
            html::text_block(&plain_text(text))
        );
    }

    escape(&plain_text(item))
}

fn render_event_msg(record: &Record) -> Entry {
    let payload = &record.payload;

    match EventKind::parse(record.subtype()) {
        kind @ (EventKind::UserMessage | EventKind::AgentMessage) => {
            let (subtype, style) = match kind {
                EventKind::UserMessage => ("user_message", EntryStyle::User),
                _ => ("agent_message", EntryStyle::Assistant),
            };
            let kind_label = field_text(payload, "kind", "plain");
            let message = match payload.get("message") {
                None => html::pre(""),
                Some(Value::Null) => String::new(),
                Some(message) => html::pre(&plain_text(message)),
            };
            let body = format!(
                "<div><strong>Kind:</strong> {}</div>{message}",
                escape(&kind_label)
            );
            new_entry(
                record,
                format!("Event · {subtype}"),
                body,
                style,
                format!("event_msg/{subtype}"),
            )
        }
        EventKind::TokenCount => {
            let empty = Value::Object(serde_json::Map::new());
            let info = payload
                .get("info")
                .filter(|info| is_truthy(info))
                .unwrap_or(&empty);
            new_entry(
                record,
                "Token usage",
                html::payload_block(info, true),
                EntryStyle::Metric,
                "event_msg/token_count",
            )
            .tagged(EntryTag::CollapsibleMeta)
        }
        EventKind::Other(subtype) => {
            let subtype = subtype.unwrap_or("unknown");
            new_entry(
                record,
                format!("Event ({subtype})"),
                html::payload_block(payload, false),
                EntryStyle::System,
                format!("event_msg/{subtype}"),
            )
        }
    }
}

/// Text of `key`, or `default` when it is missing or `null`.
fn field_text(value: &Value, key: &str, default: &str) -> String {
    match value.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(field) => plain_text(field),
    }
}

fn new_entry(
    record: &Record,
    label: impl Into<String>,
    body_html: String,
    style: EntryStyle,
    raw_type: impl Into<String>,
) -> Entry {
    Entry {
        timestamp: record.timestamp.clone(),
        label: label.into(),
        body_html,
        style,
        raw_type: raw_type.into(),
        line_no: record.line_no,
        tags: Vec::new(),
    }
}

impl Entry {
    fn tagged(mut self, tag: EntryTag) -> Self {
        self.tags.push(tag);
        self
    }
}
