use chrono::{DateTime, Utc};
use fancy_regex::Regex;
use std::sync::LazyLock;

use crate::parser::formats::iso::parse_iso_timestamp;
use crate::parser::{ContentType, Parsed, Recognize, Severity};

// key=value or key="quoted value"
static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?P<key>[\w.]+)=(?:"(?P<qval>[^"]*)"|(?P<val>\S*))"#).unwrap()
});

const TIME_KEYS: [&str; 5] = ["time", "ts", "timestamp", "t", "datetime"];
const LEVEL_KEYS: [&str; 5] = ["level", "lvl", "severity", "loglevel", "log_level"];
const COMPONENT_KEYS: [&str; 7] =
    ["service", "component", "app", "source", "caller", "logger", "name"];

const MIN_PAIRS: usize = 2;
const EPOCH_MS_THRESHOLD: f64 = 1e12;

/// logfmt structured logs: `time=2024-01-15T10:30:00Z level=info msg="ok"`.
///
/// Requires at least two key=value pairs and one recognized time key;
/// anything looser would swallow ordinary prose containing an `=`.
pub struct Logfmt;

impl Recognize for Logfmt {
    fn name(&self) -> &'static str {
        "logfmt"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for m in PAIR_RE.captures_iter(raw) {
            let caps = m.ok()?;
            let key = caps.name("key")?.as_str();
            let value = caps
                .name("qval")
                .or_else(|| caps.name("val"))
                .map_or("", |v| v.as_str());
            pairs.push((key, value));
        }
        if pairs.len() < MIN_PAIRS {
            return None;
        }

        let get = |key: &str| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);

        // A time-like key is what distinguishes logfmt from prose with '='
        if !TIME_KEYS.iter().any(|tk| get(tk).is_some()) {
            return None;
        }
        let timestamp = TIME_KEYS
            .iter()
            .filter_map(|tk| get(tk))
            .find_map(parse_timestamp);

        let severity = LEVEL_KEYS
            .iter()
            .filter_map(|lk| get(lk))
            .find_map(Severity::from_label);

        let component = COMPONENT_KEYS
            .iter()
            .find_map(|ck| get(ck))
            .map(str::to_string);

        Some(Parsed {
            timestamp,
            content_offset: 0,
            content_type: ContentType::Text,
            structured: None,
            severity,
            component,
        })
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Some(ts) = parse_iso_timestamp(value) {
        return Some(ts);
    }
    // Epoch seconds or milliseconds
    let num: f64 = value.parse().ok()?;
    let millis = if num > EPOCH_MS_THRESHOLD { num } else { num * 1000.0 };
    DateTime::from_timestamp_millis(millis as i64)
}
