use chrono::{DateTime, Datelike, NaiveDate, Utc};
use fancy_regex::Regex;
use std::sync::LazyLock;

use crate::parser::formats::month_number;
use crate::parser::{classify_content, extract_severity, Parsed, Recognize};

// RFC 3164 header: "Jan 15 10:30:00" or "Jan  5 10:30:00"
static SYSLOG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<month>Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(?P<day>\d{1,2})\s+(?P<hour>\d{2}):(?P<min>\d{2}):(?P<sec>\d{2})\s+",
    )
    .unwrap()
});

// "hostname program[pid]: message"
static HOST_PROG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<host>[a-zA-Z][\w.-]+)\s+(?P<prog>[\w./-]+?)(?:\[(?P<pid>\d+)\])?:\s+")
        .unwrap()
});

/// Syslog RFC 3164: `Mon DD HH:MM:SS hostname program[pid]: message`.
///
/// The header carries no year; the current year is assumed.
pub struct Syslog;

impl Recognize for Syslog {
    fn name(&self) -> &'static str {
        "syslog"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        let caps = SYSLOG_RE.captures(raw).ok()??;
        let whole = caps.get(0)?;
        let field = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());
        let month = month_number(caps.name("month")?.as_str())?;
        let naive = NaiveDate::from_ymd_opt(Utc::now().year(), month, field("day")?)?
            .and_hms_opt(field("hour")?, field("min")?, field("sec")?)?;
        let timestamp: DateTime<Utc> = naive.and_utc();

        // Strip "hostname program[pid]:" and keep the program as component
        let mut offset = whole.end();
        let mut component = None;
        if let Ok(Some(host_caps)) = HOST_PROG_RE.captures(&raw[offset..]) {
            if let (Some(whole_prefix), Some(prog)) = (host_caps.get(0), host_caps.name("prog")) {
                component = Some(match host_caps.name("pid") {
                    Some(pid) => format!("{}[{}]", prog.as_str(), pid.as_str()),
                    None => prog.as_str().to_string(),
                });
                offset += whole_prefix.end();
            }
        }

        let content = &raw[offset..];
        let (content_type, structured) = classify_content(content);
        let severity = extract_severity(content, structured.as_ref());
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
