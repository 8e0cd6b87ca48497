//! Message template extraction: masking, hashing, grouping.

use ahash::{AHashMap, RandomState};
use fancy_regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::parser::{ContentType, LogRecord, Severity};

// Masking patterns, applied in order: more specific first
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});
static ISO_TS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}[\w.+:-]*").unwrap());
static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap());
static PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[\w./-]+").unwrap());
static HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[0-9a-f]{8,}\b").unwrap());
static NUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+\.?\d*").unwrap());

/// Structured fields commonly carrying the event identifier, in priority order.
const EVENT_KEYS: [&str; 8] = [
    "event",
    "message",
    "msg",
    "error",
    "err",
    "description",
    "text",
    "action",
];

/// Fixed-seed hash of a template string, deterministic within a process.
pub type TemplateHash = u64;

static TEMPLATE_HASHER: LazyLock<RandomState> =
    LazyLock::new(|| RandomState::with_seeds(0x6c6f_676c, 0x656e_7331, 0x7465_6d70, 0x6c61_7465));

pub fn template_hash(template: &str) -> TemplateHash {
    TEMPLATE_HASHER.hash_one(template)
}

/// Replace the variable parts of a text message with tokens.
pub fn mask_text(text: &str) -> String {
    let mut result = text.to_string();
    for (re, token) in [
        (&*UUID_RE, "<UUID>"),
        (&*ISO_TS_RE, "<TS>"),
        (&*IPV4_RE, "<IP>"),
        (&*PATH_RE, "<PATH>"),
        (&*HEX_RE, "<HEX>"),
        (&*NUM_RE, "<NUM>"),
    ] {
        result = re.replace_all(&result, token).into_owned();
    }
    result
}

/// Template for one record.
///
/// Structured records group by their event field (masked) when one is
/// present, so records differing only in ancillary fields share a
/// template; otherwise by full sorted key structure. Text records are
/// masked directly.
pub fn extract_template(record: &LogRecord) -> String {
    if record.content_type == ContentType::Structured {
        if let Some(map) = &record.structured {
            for key in EVENT_KEYS {
                if let Some(Value::String(text)) = map.get(key) {
                    return format!("{key}:{}", mask_text(text));
                }
            }
            return structured_template(map);
        }
    }
    mask_text(record.content())
}

fn structured_template(map: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    let parts: Vec<String> = keys
        .into_iter()
        .map(|key| {
            let value = &map[key];
            match value {
                Value::Object(nested) => format!("{key}={{{}}}", structured_template(nested)),
                Value::Array(_) => format!("{key}=[...]"),
                Value::Bool(_) => format!("{key}=<BOOL>"),
                Value::Number(_) => format!("{key}=<NUM>"),
                Value::String(s) => {
                    let masked = mask_text(s);
                    if masked == *s {
                        format!("{key}=<STR>")
                    } else {
                        format!("{key}={masked}")
                    }
                }
                Value::Null => format!("{key}=<?>"),
            }
        })
        .collect();
    parts.join(" ")
}

/// A group of records sharing one template.
#[derive(Debug, Clone)]
pub struct TemplateGroup {
    pub template: String,
    pub hash: TemplateHash,
    /// First member's content, kept verbatim as an example.
    pub example: String,
    pub record_indices: Vec<usize>,
    pub count: usize,
    /// Most frequent severity among members.
    pub severity: Option<Severity>,
    pub first_seen: usize,
    pub last_seen: usize,
}

/// Group records by template, most frequent first.
pub fn build_template_groups(records: &[LogRecord]) -> Vec<TemplateGroup> {
    let mut order: Vec<TemplateHash> = Vec::new();
    let mut groups: AHashMap<TemplateHash, TemplateGroup> = AHashMap::new();
    let mut level_counts: AHashMap<TemplateHash, AHashMap<Severity, usize>> = AHashMap::new();

    for (index, record) in records.iter().enumerate() {
        let template = extract_template(record);
        let hash = template_hash(&template);
        let group = groups.entry(hash).or_insert_with(|| {
            order.push(hash);
            TemplateGroup {
                template,
                hash,
                example: record.content().to_string(),
                record_indices: Vec::new(),
                count: 0,
                severity: None,
                first_seen: index,
                last_seen: index,
            }
        });
        group.record_indices.push(index);
        group.count += 1;
        group.last_seen = index;
        if let Some(sev) = record.severity {
            let counts = level_counts.entry(hash).or_default();
            *counts.entry(sev).or_insert(0) += 1;
            group.severity = counts
                .iter()
                .max_by_key(|(_, n)| **n)
                .map(|(sev, _)| *sev);
        }
    }

    let mut result: Vec<TemplateGroup> = order
        .into_iter()
        .filter_map(|hash| groups.remove(&hash))
        .collect();
    // Stable, so equal counts keep first-seen order
    result.sort_by_key(|g| std::cmp::Reverse(g.count));
    result
}

/// Per-record template hashes, for per-line anomaly lookup.
pub fn record_template_hashes(records: &[LogRecord]) -> Vec<TemplateHash> {
    records
        .iter()
        .map(|record| template_hash(&extract_template(record)))
        .collect()
}

/// Convert a template back into a regex that matches its members, so a
/// template can be turned into a filter rule directly.
pub fn template_to_regex(template: &str) -> String {
    let mut pattern = fancy_regex::escape(template).into_owned();
    for (token, source) in [
        (
            "<UUID>",
            r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        ),
        ("<TS>", r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}[\w.+:-]*"),
        ("<IP>", r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}"),
        ("<PATH>", r"/[\w./-]+"),
        ("<HEX>", r"[0-9a-f]{8,}"),
        ("<NUM>", r"-?\d+\.?\d*"),
        ("<STR>", r".+?"),
        ("<BOOL>", r"(?:true|false)"),
    ] {
        pattern = pattern.replace(&fancy_regex::escape(token).into_owned(), source);
    }
    pattern
}
