use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use fancy_regex::Regex;
use std::sync::LazyLock;

use crate::parser::formats::month_number;
use crate::parser::{classify_content, extract_severity, Parsed, Recognize};

// Apache/Nginx CLF timestamp: "[15/Jan/2024:10:30:00 +0000]"
static APACHE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[(?P<day>\d{2})/(?P<month>Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)/(?P<year>\d{4}):(?P<hour>\d{2}):(?P<min>\d{2}):(?P<sec>\d{2})\s+(?P<sign>[+-])(?P<offh>\d{2})(?P<offm>\d{2})\]\s+",
    )
    .unwrap()
});

/// Apache/Nginx Common Log Format timestamps.
pub struct Apache;

impl Recognize for Apache {
    fn name(&self) -> &'static str {
        "apache"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        let caps = APACHE_RE.captures(raw).ok()??;
        let whole = caps.get(0)?;
        let field = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
        let month = month_number(caps.name("month")?.as_str())?;
        let naive = NaiveDate::from_ymd_opt(field("year")? as i32, month, field("day")?)?
            .and_hms_opt(field("hour")?, field("min")?, field("sec")?)?;

        let offset_secs = (field("offh")? * 3600 + field("offm")? * 60) as i32;
        let offset_secs = if caps.name("sign")?.as_str() == "-" {
            -offset_secs
        } else {
            offset_secs
        };
        let tz = FixedOffset::east_opt(offset_secs)?;
        let timestamp = tz.from_local_datetime(&naive).single()?.with_timezone(&Utc);

        let content = &raw[whole.end()..];
        let (content_type, structured) = classify_content(content);
        let severity = extract_severity(content, structured.as_ref());
        Some(Parsed {
            timestamp: Some(timestamp),
            content_offset: whole.end(),
            content_type,
            structured,
            severity,
            component: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn clf_timestamp() {
        let raw = r#"[15/Jan/2024:10:30:00 +0000] "GET /index.html HTTP/1.1" 200 1234"#;
        let parsed = Apache.try_parse(raw).unwrap();
        assert_eq!(parsed.timestamp.unwrap().hour(), 10);
        assert_eq!(
            &raw[parsed.content_offset..],
            r#""GET /index.html HTTP/1.1" 200 1234"#
        );
    }

    #[test]
    fn offset_applied() {
        let raw = "[15/Jan/2024:10:30:00 +0200] request";
        let parsed = Apache.try_parse(raw).unwrap();
        assert_eq!(parsed.timestamp.unwrap().hour(), 8);
    }

    #[test]
    fn negative_offset() {
        let raw = "[15/Jan/2024:10:30:00 -0500] request";
        let parsed = Apache.try_parse(raw).unwrap();
        assert_eq!(parsed.timestamp.unwrap().hour(), 15);
    }

    #[test]
    fn rejects_other_brackets() {
        assert!(Apache.try_parse("[INFO] not a timestamp").is_none());
        assert!(Apache.try_parse("[pod-name] container log").is_none());
    }
}
