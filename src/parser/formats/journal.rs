use chrono::DateTime;
use serde_json::Value;

use crate::parser::{
    classify_content, extract_severity, value_to_string, ContentType, Parsed, Recognize, Severity,
};

/// systemd journal JSON export (`journalctl -o json`).
///
/// One JSON object per line with the well-known fields
/// `__REALTIME_TIMESTAMP` (microseconds since epoch), `PRIORITY`,
/// `SYSLOG_IDENTIFIER`, `_COMM`, and `MESSAGE`. A line without a realtime
/// timestamp field is not journal output, however JSON-shaped it looks.
pub struct Journal;

/// syslog severities 0..=7 as journald encodes them in PRIORITY.
fn priority_severity(priority: &str) -> Option<Severity> {
    match priority {
        "0" | "1" | "2" => Some(Severity::Fatal), // emerg, alert, crit
        "3" => Some(Severity::Error),
        "4" => Some(Severity::Warn),
        "5" | "6" => Some(Severity::Info), // notice, info
        "7" => Some(Severity::Debug),
        _ => None,
    }
}

impl Recognize for Journal {
    fn name(&self) -> &'static str {
        "journal"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        let (content_type, structured) = classify_content(raw);
        if content_type != ContentType::Structured {
            return None;
        }
        let map = structured?;

        let micros_field = map
            .get("__REALTIME_TIMESTAMP")
            .or_else(|| map.get("_SOURCE_REALTIME_TIMESTAMP"))?;
        let micros: i64 = value_to_string(micros_field).parse().ok()?;
        let timestamp = DateTime::from_timestamp_micros(micros)?;

        let component = map
            .get("SYSLOG_IDENTIFIER")
            .or_else(|| map.get("_COMM"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let severity = map
            .get("PRIORITY")
            .and_then(|p| priority_severity(value_to_string(p).trim()))
            .or_else(|| {
                map.get("MESSAGE")
                    .and_then(Value::as_str)
                    .and_then(|msg| extract_severity(msg, None))
            });

        Some(Parsed {
            timestamp: Some(timestamp),
            content_offset: 0,
            content_type: ContentType::Structured,
            structured: Some(map),
            severity,
            component,
        })
    }
}
