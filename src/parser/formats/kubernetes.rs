use fancy_regex::Regex;
use std::sync::LazyLock;

use crate::parser::formats::iso::Iso;
use crate::parser::{classify_content, extract_severity, Parsed, Recognize};

// "[pod-name] ..." as produced by kubectl logs --prefix (stern-style)
static BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[(?P<comp>[a-z0-9][\w.-]+)\]\s*").unwrap());

// "pod-name container-name 2024-01-15T..." as produced by multi-container
// tailers. The lookahead keeps this from eating ordinary two-word prose.
static POD_CONTAINER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<comp>[a-z0-9][\w.-]+)\s+(?P<cont>[a-z0-9][\w.-]+)\s+(?=\d{4}-)").unwrap()
});

/// Kubernetes pod-prefixed log lines, bracketed or pod/container style.
pub struct Kubernetes {
    timestamp_recognizer: Iso,
}

impl Kubernetes {
    pub fn new() -> Self {
        Kubernetes {
            timestamp_recognizer: Iso,
        }
    }

    fn parse_prefixed(&self, raw: &str, prefix_end: usize, component: String) -> Parsed {
        let remainder = &raw[prefix_end..];
        if let Some(mut parsed) = self.timestamp_recognizer.try_parse(remainder) {
            parsed.content_offset += prefix_end;
            parsed.component = Some(component);
            return parsed;
        }
        let (content_type, structured) = classify_content(remainder);
        let severity = extract_severity(remainder, structured.as_ref());
        Parsed {
            timestamp: None,
            content_offset: prefix_end,
            content_type,
            structured,
            severity,
            component: Some(component),
        }
    }
}

impl Default for Kubernetes {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognize for Kubernetes {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    fn try_parse(&self, raw: &str) -> Option<Parsed> {
        if let Ok(Some(caps)) = BRACKET_RE.captures(raw) {
            let whole = caps.get(0)?;
            let component = caps.name("comp")?.as_str().to_string();
            return Some(self.parse_prefixed(raw, whole.end(), component));
        }
        if let Ok(Some(caps)) = POD_CONTAINER_RE.captures(raw) {
            let whole = caps.get(0)?;
            let component = format!(
                "{}/{}",
                caps.name("comp")?.as_str(),
                caps.name("cont")?.as_str()
            );
            return Some(self.parse_prefixed(raw, whole.end(), component));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_prefix_with_timestamp() {
        let raw = "[api-7f9b4] 2024-01-15T10:30:00Z request handled";
        let parsed = Kubernetes::new().try_parse(raw).unwrap();
        assert_eq!(parsed.component.as_deref(), Some("api-7f9b4"));
        assert!(parsed.timestamp.is_some());
        assert_eq!(&raw[parsed.content_offset..], "request handled");
    }

    #[test]
    fn bracket_prefix_without_timestamp() {
        let raw = "[worker-0] ready";
        let parsed = Kubernetes::new().try_parse(raw).unwrap();
        assert_eq!(parsed.component.as_deref(), Some("worker-0"));
        assert!(parsed.timestamp.is_none());
        assert_eq!(&raw[parsed.content_offset..], "ready");
    }

    #[test]
    fn pod_container_prefix() {
        let raw = "api-7f9b4 nginx 2024-01-15T10:30:00Z upstream connected";
        let parsed = Kubernetes::new().try_parse(raw).unwrap();
        assert_eq!(parsed.component.as_deref(), Some("api-7f9b4/nginx"));
        assert!(parsed.timestamp.is_some());
        assert_eq!(&raw[parsed.content_offset..], "upstream connected");
    }

    #[test]
    fn two_word_prose_is_not_a_pod_prefix() {
        // No ISO timestamp after the second word: lookahead rejects it
        assert!(Kubernetes::new().try_parse("hello world no timestamp").is_none());
    }

    #[test]
    fn level_bracket_is_not_a_pod() {
        // Pod names start lowercase alphanumeric
        assert!(Kubernetes::new().try_parse("[INFO] starting up").is_none());
    }
}
