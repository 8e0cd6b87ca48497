use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use fancy_regex::Regex;
use std::sync::LazyLock;

use crate::parser::{classify_content, extract_component, extract_severity, Parsed, Recognize};

// ISO 8601: "2024-01-15T10:30:00Z", "2024-01-15 10:30:00.123", "2024-01-15T10:30:00+02:00"
static ISO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<dt>\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?)\s+",
    )
    .unwrap()
});

// Slash dates: "2024/01/15 10:30:00"
static SLASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})/(?P<month>\d{2})/(?P<day>\d{2})\s+(?P<hour>\d{2}):(?P<min>\d{2}):(?P<sec>\d{2})\s+",
    )
    .unwrap()
});

/// Parse an ISO 8601 timestamp string, with or without fraction and offset.
/// Offset-less timestamps are taken as UTC.
pub fn parse_iso_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let normalized = s.replacen(' ', "T", 1);
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    // Offsets without a colon ("+0200") are not RFC 3339
    if let Ok(dt) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Generic catch-all: ISO 8601 and slash-date timestamp prefixes.
pub struct Iso;

impl Recognize for Iso {
    fn name(&self) -> &'static str {
        "iso"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        let (timestamp, offset) = try_iso(raw).or_else(|| try_slash_date(raw))?;
        let content = &raw[offset..];
        let (content_type, structured) = classify_content(content);
        let severity = extract_severity(content, structured.as_ref());
        let component = extract_component(structured.as_ref());
        Some(Parsed {
            timestamp: Some(timestamp),
            content_offset: offset,
            content_type,
            structured,
            severity,
            component,
        })
    }
}

fn try_iso(raw: &str) -> Option<(DateTime<Utc>, usize)> {
    let caps = ISO_RE.captures(raw).ok()??;
    let whole = caps.get(0)?;
    let ts = parse_iso_timestamp(caps.name("dt")?.as_str())?;
    Some((ts, whole.end()))
}

fn try_slash_date(raw: &str) -> Option<(DateTime<Utc>, usize)> {
    let caps = SLASH_RE.captures(raw).ok()??;
    let whole = caps.get(0)?;
    let field = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
    let naive = NaiveDate::from_ymd_opt(field("year")? as i32, field("month")?, field("day")?)?
        .and_hms_opt(field("hour")?, field("min")?, field("sec")?)?;
    Some((naive.and_utc(), whole.end()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn iso_with_zulu() {
        let parsed = Iso.try_parse("2024-01-15T10:30:00Z ERROR boom").unwrap();
        let ts = parsed.timestamp.unwrap();
        assert_eq!(ts.hour(), 10);
        assert_eq!(&"2024-01-15T10:30:00Z ERROR boom"[parsed.content_offset..], "ERROR boom");
    }

    #[test]
    fn iso_with_space_and_fraction() {
        let parsed = Iso.try_parse("2024-01-15 10:30:00.123 msg body").unwrap();
        let ts = parsed.timestamp.unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 123);
    }

    #[test]
    fn iso_with_offset() {
        let parsed = Iso.try_parse("2024-01-15T10:30:00+02:00 msg").unwrap();
        assert_eq!(parsed.timestamp.unwrap().hour(), 8); // converted to UTC
    }

    #[test]
    fn slash_date() {
        let parsed = Iso.try_parse("2024/01/15 10:30:00 cache warmed").unwrap();
        assert!(parsed.timestamp.is_some());
        assert_eq!(&"2024/01/15 10:30:00 cache warmed"[parsed.content_offset..], "cache warmed");
    }

    #[test]
    fn rejects_lines_without_timestamp() {
        assert!(Iso.try_parse("ERROR no timestamp here").is_none());
        assert!(Iso.try_parse("2024-13-45T99:99:99Z nonsense date").is_none());
    }

    #[test]
    fn structured_content_detected() {
        let parsed = Iso
            .try_parse(r#"2024-01-15T10:30:00Z {"service": "api", "msg": "hit"}"#)
            .unwrap();
        assert!(parsed.structured.is_some());
        assert_eq!(parsed.component.as_deref(), Some("api"));
    }
}
