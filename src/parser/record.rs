use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Log severity level, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    /// Normalize a level word to a severity. Accepts the aliases found
    /// across syslog, journald, and common application loggers.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace),
            "debug" | "dbg" => Some(Severity::Debug),
            "info" | "information" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warn),
            "error" | "err" => Some(Severity::Error),
            "fatal" | "critical" | "crit" | "panic" | "emerg" => Some(Severity::Fatal),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    /// Single-character badge for compact display.
    pub const fn badge(self) -> char {
        match self {
            Severity::Trace => 'T',
            Severity::Debug => 'D',
            Severity::Info => 'I',
            Severity::Warn => 'W',
            Severity::Error => 'E',
            Severity::Fatal => 'F',
        }
    }
}

/// Whether a line's content parsed as a structured object or is plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Structured,
    Text,
}

/// A single normalized log line.
///
/// `raw` is the unmodified input line; everything else is derived from it
/// exactly once at parse time. The content is never stored separately:
/// [`LogRecord::content`] slices `raw` at `content_offset`.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Unique per source; reassigned when multiple sources are merged.
    pub line_number: usize,
    /// Original line number in the source, preserved across merges.
    pub source_line_number: usize,
    pub raw: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// Byte offset where the recognized prefix (timestamp, component tag)
    /// ends. Always `<= raw.len()` and on a char boundary.
    pub content_offset: usize,
    pub content_type: ContentType,
    /// Present only when `content_type` is `Structured`.
    pub structured: Option<Map<String, Value>>,
    pub severity: Option<Severity>,
    pub component: Option<String>,
}

impl LogRecord {
    /// A bare record for a line no recognizer matched.
    pub fn unrecognized(line_number: usize, raw: String) -> Self {
        LogRecord {
            line_number,
            source_line_number: line_number,
            raw,
            timestamp: None,
            content_offset: 0,
            content_type: ContentType::Text,
            structured: None,
            severity: None,
            component: None,
        }
    }

    /// The line with its recognized prefix stripped.
    pub fn content(&self) -> &str {
        &self.raw[self.content_offset..]
    }

    /// Look up a dot-separated key path in the structured content.
    pub fn structured_value(&self, key_path: &str) -> Option<&Value> {
        let map = self.structured.as_ref()?;
        let mut keys = key_path.split('.');
        let mut current = map.get(keys.next()?)?;
        for key in keys {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }
}
