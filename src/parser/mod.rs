pub mod formats;
pub mod record;

use chrono::{DateTime, Utc};
use fancy_regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

pub use record::{ContentType, LogRecord, Severity};

use formats::{
    apache::Apache, docker::Docker, iso::Iso, journal::Journal, kubernetes::Kubernetes,
    logfmt::Logfmt, python::PythonLogging, syslog::Syslog,
};

// Lexical severity patterns, tried in order: [LEVEL], level=value, bare LEVEL word
static LEVEL_BRACKET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\[(?P<level>TRACE|DEBUG|DBG|INFO|WARN|WARNING|ERROR|ERR|FATAL|CRITICAL|CRIT|PANIC|EMERG)\]",
    )
    .unwrap()
});
static LEVEL_KV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:level|severity)=(?P<level>\w+)").unwrap());
static LEVEL_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|\s)(?P<level>TRACE|DEBUG|DBG|INFO|WARN|WARNING|ERROR|ERR|FATAL|CRITICAL)\s",
    )
    .unwrap()
});

/// Structured field names checked for a severity, in priority order.
const LEVEL_FIELD_KEYS: [&str; 5] = ["log_level", "level", "severity", "loglevel", "lvl"];

/// Structured field names checked for a component, in priority order.
const COMPONENT_FIELD_KEYS: [&str; 6] =
    ["service", "component", "app", "source", "container", "pod"];

/// What a recognizer extracted from one line.
///
/// `content_offset` is relative to the string the recognizer was handed;
/// recognizers that strip a prefix and delegate add their prefix length to
/// the sub-recognizer's offset.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub timestamp: Option<DateTime<Utc>>,
    pub content_offset: usize,
    pub content_type: ContentType,
    pub structured: Option<Map<String, Value>>,
    pub severity: Option<Severity>,
    pub component: Option<String>,
}

/// A log format recognizer: a pure function over one line of text.
pub trait Recognize: Send + Sync {
    /// Short identifier (e.g. "syslog"), used for CLI selection and logging.
    fn name(&self) -> &'static str;

    /// Attempt to parse one raw line. `None` means the line does not match
    /// this format; it is never an error.
    fn try_parse(&self, raw: &str) -> Option<Parsed>;

    /// Parse a raw line into a full record, falling back to a bare
    /// plain-text record when the format does not match.
    ///
    /// A recognized line with a timestamp but no detected severity defaults
    /// to `Info`. The default is applied here and nowhere else, so batch
    /// parsing, tailing, and merging agree on it.
    fn parse_line(&self, line_number: usize, raw: &str) -> LogRecord {
        match self.try_parse(raw) {
            Some(parsed) => {
                let severity = match (parsed.severity, parsed.timestamp) {
                    (None, Some(_)) => Some(Severity::Info),
                    (sev, _) => sev,
                };
                LogRecord {
                    line_number,
                    source_line_number: line_number,
                    raw: raw.to_string(),
                    timestamp: parsed.timestamp,
                    content_offset: parsed.content_offset,
                    content_type: parsed.content_type,
                    structured: parsed.structured,
                    severity,
                    component: parsed.component,
                }
            }
            None => {
                let (content_type, structured) = classify_content(raw);
                let severity = extract_severity(raw, structured.as_ref());
                let mut record = LogRecord::unrecognized(line_number, raw.to_string());
                record.content_type = content_type;
                record.structured = structured;
                record.severity = severity;
                record
            }
        }
    }
}

/// Composite recognizer that tries every format in fixed priority order.
///
/// Construct one explicitly and pass it where needed; there is no global
/// default instance.
pub struct Auto {
    recognizers: Vec<Box<dyn Recognize>>,
}

impl Auto {
    pub fn new() -> Self {
        // More specific formats first; Iso is the generic catch-all.
        Auto {
            recognizers: vec![
                Box::new(Docker::new()),
                Box::new(Kubernetes::new()),
                Box::new(Journal),
                Box::new(PythonLogging),
                Box::new(Apache),
                Box::new(Syslog),
                Box::new(Logfmt),
                Box::new(Iso),
            ],
        }
    }
}

impl Default for Auto {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognize for Auto {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        self.recognizers.iter().find_map(|r| r.try_parse(raw))
    }
}

/// Look up a single recognizer by name for explicit `--format` selection.
pub fn recognizer_by_name(name: &str) -> Option<Box<dyn Recognize>> {
    match name {
        "auto" => Some(Box::new(Auto::new())),
        "docker" => Some(Box::new(Docker::new())),
        "kubernetes" => Some(Box::new(Kubernetes::new())),
        "journal" => Some(Box::new(Journal)),
        "python" => Some(Box::new(PythonLogging)),
        "apache" => Some(Box::new(Apache)),
        "syslog" => Some(Box::new(Syslog)),
        "logfmt" => Some(Box::new(Logfmt)),
        "iso" => Some(Box::new(Iso)),
        _ => None,
    }
}

/// How many non-blank lines whole-source detection samples.
const DETECT_SAMPLE_LINES: usize = 20;

/// Detect the dominant format of a source by sampling its first lines.
///
/// Scores every recognizer by match count over at most
/// [`DETECT_SAMPLE_LINES`] non-blank lines and commits to the top scorer
/// only if it matched more than half the sample. Ties break toward the more
/// specific format (earlier in priority order). Anything less decisive
/// falls back to per-line auto detection.
pub fn detect_format<'a, I>(lines: I) -> Box<dyn Recognize>
where
    I: IntoIterator<Item = &'a str>,
{
    let sample: Vec<&str> = lines
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .take(DETECT_SAMPLE_LINES)
        .collect();
    if sample.is_empty() {
        return Box::new(Auto::new());
    }

    let candidates: Vec<Box<dyn Recognize>> = vec![
        Box::new(Docker::new()),
        Box::new(Kubernetes::new()),
        Box::new(Journal),
        Box::new(PythonLogging),
        Box::new(Apache),
        Box::new(Syslog),
        Box::new(Logfmt),
        Box::new(Iso),
    ];

    let mut best: Option<(usize, Box<dyn Recognize>)> = None;
    for candidate in candidates {
        let score = sample
            .iter()
            .filter(|line| candidate.try_parse(line).is_some())
            .count();
        // Strictly-greater keeps the first (most specific) scorer on ties.
        if best.as_ref().is_none_or(|(s, _)| score > *s) {
            best = Some((score, candidate));
        }
    }

    match best {
        Some((score, recognizer)) if score * 2 > sample.len() => {
            log::info!(
                "detected format '{}' ({score}/{} sampled lines)",
                recognizer.name(),
                sample.len()
            );
            recognizer
        }
        _ => {
            log::info!("no dominant format in sample, using per-line auto detection");
            Box::new(Auto::new())
        }
    }
}

// ---- Shared helpers used by all recognizers ----

/// Classify content as a structured object or plain text.
///
/// Only JSON objects count as structured; arrays and scalars stay text.
pub fn classify_content(content: &str) -> (ContentType, Option<Map<String, Value>>) {
    let stripped = content.trim_start();
    if stripped.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(stripped) {
            return (ContentType::Structured, Some(map));
        }
    }
    (ContentType::Text, None)
}

/// Render a structured value the way a user would type it in a filter.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extract a severity from structured fields, lexical patterns, or keyword
/// heuristics, in that order. Returns `None` when nothing matched.
pub fn extract_severity(
    content: &str,
    structured: Option<&Map<String, Value>>,
) -> Option<Severity> {
    if let Some(map) = structured {
        for key in LEVEL_FIELD_KEYS {
            if let Some(value) = map.get(key) {
                if let Some(sev) = Severity::from_label(value_to_string(value).trim()) {
                    return Some(sev);
                }
            }
        }
    }

    for pattern in [&*LEVEL_BRACKET_RE, &*LEVEL_KV_RE, &*LEVEL_WORD_RE] {
        if let Ok(Some(caps)) = pattern.captures(content) {
            if let Some(sev) = caps
                .name("level")
                .and_then(|m| Severity::from_label(m.as_str()))
            {
                return Some(sev);
            }
        }
    }

    // Keyword heuristic for lines without an explicit level
    let lower = content.to_lowercase();
    if ["fail", "refused", "denied", "timeout", "abort", "segfault", "panic"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return Some(Severity::Error);
    }
    if ["deprecated", "warning:", "warn:", "cannot", "unable"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return Some(Severity::Warn);
    }

    None
}

/// Extract a component name from structured fields.
pub fn extract_component(structured: Option<&Map<String, Value>>) -> Option<String> {
    let map = structured?;
    for key in COMPONENT_FIELD_KEYS {
        if let Some(Value::String(s)) = map.get(key) {
            return Some(s.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> LogRecord {
        Auto::new().parse_line(1, raw)
    }

    #[test]
    fn every_line_yields_a_record() {
        for raw in ["", "   ", "no format here", "{broken json", "[]", "1234"] {
            let record = parse(raw);
            assert_eq!(record.raw, raw);
            assert!(record.content_offset <= record.raw.len());
        }
    }

    #[test]
    fn unrecognized_line_is_plain_text() {
        let record = parse("just some text");
        assert!(record.timestamp.is_none());
        assert_eq!(record.content_type, ContentType::Text);
        assert_eq!(record.content_offset, 0);
        assert_eq!(record.content(), "just some text");
    }

    #[test]
    fn json_array_is_not_structured() {
        let (ct, map) = classify_content(r#"[{"a": 1}]"#);
        assert_eq!(ct, ContentType::Text);
        assert!(map.is_none());
    }

    #[test]
    fn round_trip_for_recognized_formats() {
        let samples = [
            "2024-01-15T10:30:00Z ERROR Connection failed",
            "2024-01-15 10:30:00.123 starting up",
            "Jan 15 10:30:00 myhost sshd[123]: Accepted publickey",
            "[15/Jan/2024:10:30:00 +0000] GET /index.html 200",
            "api  | 2024-01-15T10:30:00Z request handled",
            "2024-01-15 10:30:00,123 - app.main - INFO - started",
            "2024/01/15 10:30:00 cache warmed",
        ];
        for raw in samples {
            let record = parse(raw);
            assert!(record.timestamp.is_some(), "no timestamp for {raw:?}");
            assert_eq!(
                format!("{}{}", &record.raw[..record.content_offset], record.content()),
                record.raw,
                "round trip failed for {raw:?}"
            );
        }
    }

    #[test]
    fn timestamp_without_level_defaults_to_info() {
        let record = parse("2024-01-15T10:30:00Z nothing notable here");
        assert_eq!(record.severity, Some(Severity::Info));
    }

    #[test]
    fn no_timestamp_no_level_stays_unset() {
        let record = parse("nothing notable here");
        assert_eq!(record.severity, None);
    }

    #[test]
    fn severity_from_structured_field_wins() {
        let record = parse(r#"2024-01-15T10:30:00Z {"level": "error", "msg": "ok result"}"#);
        assert_eq!(record.severity, Some(Severity::Error));
        assert_eq!(record.content_type, ContentType::Structured);
    }

    #[test]
    fn severity_bracket_pattern() {
        assert_eq!(
            extract_severity("something [WARN] happened", None),
            Some(Severity::Warn)
        );
    }

    #[test]
    fn severity_patterns_ignore_case() {
        assert_eq!(
            extract_severity("something [error] happened", None),
            Some(Severity::Error)
        );
        assert_eq!(
            extract_severity("disk warn detected early", None),
            Some(Severity::Warn)
        );
        assert_eq!(
            extract_severity("Severity=CRITICAL during boot", None),
            Some(Severity::Fatal)
        );
    }

    #[test]
    fn severity_keyword_heuristic() {
        assert_eq!(
            extract_severity("connection refused by peer", None),
            Some(Severity::Error)
        );
        assert_eq!(
            extract_severity("this API is deprecated", None),
            Some(Severity::Warn)
        );
        assert_eq!(extract_severity("all good", None), None);
    }

    #[test]
    fn component_from_structured_priority() {
        let (_, map) = classify_content(r#"{"component": "worker", "app": "backend"}"#);
        // "service" outranks "component", "component" outranks "app"
        assert_eq!(extract_component(map.as_ref()), Some("worker".to_string()));
    }

    #[test]
    fn detect_commits_to_dominant_format() {
        let lines: Vec<String> = (0..10)
            .map(|i| format!("Jan 15 10:30:{i:02} host prog[1]: message {i}"))
            .collect();
        let recognizer = detect_format(lines.iter().map(String::as_str));
        assert_eq!(recognizer.name(), "syslog");
    }

    #[test]
    fn detect_falls_back_below_majority() {
        let mut lines: Vec<String> = (0..4)
            .map(|i| format!("Jan 15 10:30:{i:02} host prog[1]: message {i}"))
            .collect();
        lines.extend((0..8).map(|i| format!("free text line {i}")));
        let recognizer = detect_format(lines.iter().map(String::as_str));
        assert_eq!(recognizer.name(), "auto");
    }

    #[test]
    fn detect_skips_blank_lines() {
        let lines = ["", "  ", "2024-01-15T10:30:00Z up", "", "2024-01-15T10:30:01Z ok"];
        let recognizer = detect_format(lines);
        assert_eq!(recognizer.name(), "iso");
    }

    #[test]
    fn detect_empty_source_uses_auto() {
        let recognizer = detect_format(std::iter::empty());
        assert_eq!(recognizer.name(), "auto");
    }
}
