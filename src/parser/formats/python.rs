use chrono::{NaiveDateTime, Timelike};
use fancy_regex::Regex;
use std::sync::LazyLock;

use crate::parser::{classify_content, extract_severity, Parsed, Recognize, Severity};

// Python logging default format: "2024-01-15 10:30:00,123 - name - LEVEL - message"
// Also matches the separator-less variant "2024-01-15 10:30:00,123 name LEVEL message".
// The comma before the milliseconds is what distinguishes this from generic ISO.
static PYTHON_LOG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<dt>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}),(?P<ms>\d{3})\s+(?:-\s+)?(?P<name>[\w.]+)\s+(?:-\s+)?(?P<level>[A-Z]+)\s+(?:-\s+)?(?P<msg>.*)$",
    )
    .unwrap()
});

/// Python stdlib logging default format.
pub struct PythonLogging;

impl Recognize for PythonLogging {
    fn name(&self) -> &'static str {
        "python"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        let caps = PYTHON_LOG_RE.captures(raw).ok()??;
        let dt = caps.name("dt")?.as_str();
        let millis: u32 = caps.name("ms")?.as_str().parse().ok()?;
        let naive = NaiveDateTime::parse_from_str(dt, "%Y-%m-%d %H:%M:%S")
            .ok()?
            .with_nanosecond(millis * 1_000_000)?;

        let msg = caps.name("msg")?;
        let component = caps.name("name").map(|m| m.as_str().to_string());
        let (content_type, structured) = classify_content(msg.as_str());
        let severity = caps
            .name("level")
            .and_then(|m| Severity::from_label(m.as_str()))
            .or_else(|| extract_severity(msg.as_str(), structured.as_ref()));

        Some(Parsed {
            timestamp: Some(naive.and_utc()),
            content_offset: msg.start(),
            content_type,
            structured,
            severity,
            component,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format() {
        let raw = "2024-01-15 10:30:00,123 - app.main - INFO - service started";
        let parsed = PythonLogging.try_parse(raw).unwrap();
        assert_eq!(parsed.severity, Some(Severity::Info));
        assert_eq!(parsed.component.as_deref(), Some("app.main"));
        assert_eq!(&raw[parsed.content_offset..], "service started");
        assert_eq!(
            parsed.timestamp.unwrap().timestamp_subsec_millis(),
            123
        );
    }

    #[test]
    fn separator_less_variant() {
        let raw = "2024-01-15 10:30:00,999 worker ERROR queue stalled";
        let parsed = PythonLogging.try_parse(raw).unwrap();
        assert_eq!(parsed.severity, Some(Severity::Error));
        assert_eq!(parsed.component.as_deref(), Some("worker"));
        assert_eq!(&raw[parsed.content_offset..], "queue stalled");
    }

    #[test]
    fn plain_iso_is_rejected() {
        // No comma-milliseconds: that's the iso recognizer's territory
        assert!(PythonLogging
            .try_parse("2024-01-15 10:30:00.123 - app - INFO - x")
            .is_none());
    }
}
