use fancy_regex::Regex;
use std::sync::LazyLock;

use crate::parser::formats::{iso::Iso, syslog::Syslog};
use crate::parser::{classify_content, extract_severity, Parsed, Recognize};

// Docker Compose prefix: "service-name  | "
static COMPOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<comp>[\w.-]+)\s+\|\s+").unwrap());

/// Docker Compose output: `service-name | <rest of line>`.
///
/// Strips the service prefix, then delegates timestamp extraction on the
/// remainder to the iso and syslog recognizers.
pub struct Docker {
    timestamp_recognizers: Vec<Box<dyn Recognize>>,
}

impl Docker {
    pub fn new() -> Self {
        Docker {
            timestamp_recognizers: vec![Box::new(Iso), Box::new(Syslog)],
        }
    }
}

impl Default for Docker {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognize for Docker {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        let caps = COMPOSE_RE.captures(raw).ok()??;
        let prefix = caps.get(0)?;
        let component = caps.name("comp")?.as_str().to_string();
        let remainder = &raw[prefix.end()..];

        for recognizer in &self.timestamp_recognizers {
            if let Some(mut parsed) = recognizer.try_parse(remainder) {
                parsed.content_offset += prefix.end();
                parsed.component = Some(component);
                return Some(parsed);
            }
        }

        // No timestamp in the remainder; classify it directly
        let (content_type, structured) = classify_content(remainder);
        let severity = extract_severity(remainder, structured.as_ref());
        Some(Parsed {
            timestamp: None,
            content_offset: prefix.end(),
            content_type,
            structured,
            severity,
            component: Some(component),
        })
    }
}
