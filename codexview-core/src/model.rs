use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    SessionMeta,
    TurnContext,
    ResponseItem,
    EventMsg,
    Unknown(String),
}

impl RecordKind {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("session_meta") => Self::SessionMeta,
            Some("turn_context") => Self::TurnContext,
            Some("response_item") => Self::ResponseItem,
            Some("event_msg") => Self::EventMsg,
            Some(other) => Self::Unknown(other.to_string()),
            None => Self::Unknown("unknown".to_string()),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionMeta => write!(f, "session_meta"),
            Self::TurnContext => write!(f, "turn_context"),
            Self::ResponseItem => write!(f, "response_item"),
            Self::EventMsg => write!(f, "event_msg"),
            Self::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

/// One decoded line of a session log.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub line_no: usize,
    pub kind: RecordKind,
    pub timestamp: String,
    pub payload: Value,
}

impl Record {
    /// The `payload.type` discriminator, if present.
    pub fn subtype(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }
}

/// A non-empty log line, either decoded or kept as a decode failure.
#[derive(Debug, Clone, PartialEq)]
pub enum LogLine {
    Record(Record),
    Malformed { line_no: usize, message: String },
}

impl LogLine {
    pub fn line_no(&self) -> usize {
        match self {
            Self::Record(record) => record.line_no,
            Self::Malformed { line_no, .. } => *line_no,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Malformed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStyle {
    System,
    User,
    Assistant,
    Tool,
    Metric,
    Error,
}

impl EntryStyle {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::System => "entry-system",
            Self::User => "entry-user",
            Self::Assistant => "entry-assistant",
            Self::Tool => "entry-tool",
            Self::Metric => "entry-metric",
            Self::Error => "entry-error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTag {
    /// Hidden by the "Hide meta blocks" toggle.
    CollapsibleMeta,
}

impl EntryTag {
    pub fn css_class(self) -> &'static str {
        match self {
            Self::CollapsibleMeta => "collapsible-meta",
        }
    }
}

/// One card of the timeline view. `body_html` is already escaped markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub timestamp: String,
    pub label: String,
    pub body_html: String,
    pub style: EntryStyle,
    pub raw_type: String,
    pub line_no: usize,
    pub tags: Vec<EntryTag>,
}

impl Entry {
    pub fn class_list(&self) -> String {
        std::iter::once(self.style.css_class())
            .chain(self.tags.iter().map(|tag| tag.css_class()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_collapsible(&self) -> bool {
        self.tags.contains(&EntryTag::CollapsibleMeta)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub index: usize,
    pub timestamp: String,
    pub line_no: usize,
    pub code: String,
    pub flags: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub label: String,
    pub diff: String,
}
