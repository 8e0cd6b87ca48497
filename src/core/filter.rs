// LogLens - GPL-3.0-or-later
// This file is part of LogLens.
//
// Copyright (C) 2025 LogLens contributors
//
// LogLens is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// LogLens is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with LogLens.  If not, see <https://www.gnu.org/licenses/>.

//! Filter rules and their batch/single-record evaluation.
//!
//! Enabled include rules OR together (no includes means everything is a
//! candidate), enabled exclude rules OR together and subtract from the
//! candidates. `evaluate` and `check` share one per-rule matcher, so the
//! batch path and the incremental append path cannot drift apart.

use chrono::{DateTime, Utc};
use fancy_regex::Regex;
use rayon::prelude::*;

use crate::parser::{value_to_string, LogRecord};

/// Whether a rule keeps or drops matching records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Include,
    Exclude,
}

/// What a rule matches against.
#[derive(Debug, Clone)]
pub enum MatchMode {
    /// Substring of the raw line, case-insensitive unless requested.
    Substring { pattern: String, case_sensitive: bool },
    /// Regex over the raw line. Compiled once at rule construction.
    Regex(Regex),
    /// Dot-separated path into the structured content, string-form compare.
    Field { path: String, value: String },
    /// Exact component equality.
    Component(String),
    /// Half-open `[start, end)`; records without a timestamp never match.
    TimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct FilterRule {
    pub kind: FilterKind,
    pub enabled: bool,
    pub matcher: MatchMode,
}

impl FilterRule {
    pub fn new(kind: FilterKind, matcher: MatchMode) -> Self {
        FilterRule {
            kind,
            enabled: true,
            matcher,
        }
    }

    /// Case-insensitive substring include/exclude, the common case.
    pub fn substring(kind: FilterKind, pattern: impl Into<String>) -> Self {
        Self::new(
            kind,
            MatchMode::Substring {
                pattern: pattern.into(),
                case_sensitive: false,
            },
        )
    }

    /// Regex rule. Compilation is the only fallible point; evaluation
    /// of a constructed rule never errors.
    pub fn regex(kind: FilterKind, pattern: &str) -> Result<Self, fancy_regex::Error> {
        Ok(Self::new(kind, MatchMode::Regex(Regex::new(pattern)?)))
    }

    /// Does this rule match the record? Ignores `kind` and `enabled`.
    pub fn matches(&self, record: &LogRecord) -> bool {
        match &self.matcher {
            MatchMode::Substring {
                pattern,
                case_sensitive,
            } => {
                if *case_sensitive {
                    record.raw.contains(pattern.as_str())
                } else {
                    record
                        .raw
                        .to_lowercase()
                        .contains(&pattern.to_lowercase())
                }
            }
            MatchMode::Regex(re) => re.is_match(&record.raw).unwrap_or(false),
            MatchMode::Field { path, value } => record
                .structured_value(path)
                .is_some_and(|v| value_to_string(v) == *value),
            MatchMode::Component(name) => {
                record.component.as_deref() == Some(name.as_str())
            }
            MatchMode::TimeRange { start, end } => record
                .timestamp
                .is_some_and(|ts| ts >= *start && ts < *end),
        }
    }
}

/// Does the record pass the rule set?
pub fn check(record: &LogRecord, rules: &[FilterRule]) -> bool {
    let mut has_include = false;
    let mut included = false;
    for rule in rules.iter().filter(|r| r.enabled) {
        match rule.kind {
            FilterKind::Include => {
                has_include = true;
                if !included && rule.matches(record) {
                    included = true;
                }
            }
            FilterKind::Exclude => {
                if rule.matches(record) {
                    return false;
                }
            }
        }
    }
    !has_include || included
}

/// Indices of all records passing the rule set, in input order.
pub fn evaluate(records: &[LogRecord], rules: &[FilterRule]) -> Vec<usize> {
    records
        .par_iter()
        .enumerate()
        .filter(|(_, record)| check(record, rules))
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Auto, Recognize};
    use chrono::TimeZone;

    fn records() -> Vec<LogRecord> {
        let auto = Auto::new();
        [
            "2024-01-15T10:30:00Z ERROR database connection failed",
            "2024-01-15T10:30:01Z INFO request handled",
            r#"2024-01-15T10:30:02Z {"level": "warn", "service": "auth", "msg": "token expiring soon"}"#,
            "plain line without anything",
            "2024-01-15T10:31:00Z DEBUG cache miss for key abc",
        ]
        .iter()
        .enumerate()
        .map(|(i, raw)| auto.parse_line(i + 1, raw))
        .collect()
    }

    #[test]
    fn no_rules_passes_everything() {
        let recs = records();
        assert_eq!(evaluate(&recs, &[]), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn includes_or_together() {
        let recs = records();
        let rules = vec![
            FilterRule::substring(FilterKind::Include, "database"),
            FilterRule::substring(FilterKind::Include, "cache"),
        ];
        assert_eq!(evaluate(&recs, &rules), vec![0, 4]);
    }

    #[test]
    fn excludes_subtract() {
        let recs = records();
        let rules = vec![FilterRule::substring(FilterKind::Exclude, "request")];
        assert_eq!(evaluate(&recs, &rules), vec![0, 2, 3, 4]);
    }

    #[test]
    fn include_then_exclude() {
        let recs = records();
        let rules = vec![
            FilterRule::substring(FilterKind::Include, "2024"),
            FilterRule::substring(FilterKind::Exclude, "debug cache"),
        ];
        assert_eq!(evaluate(&recs, &rules), vec![0, 1, 2]);
    }

    #[test]
    fn error_include_with_timeout_exclude() {
        let auto = Auto::new();
        let recs: Vec<LogRecord> = [
            "ERROR database connection lost",
            "INFO request served",
            "WARN retry scheduled",
            "ERROR Timeout waiting for upstream",
            "INFO request served",
            "DEBUG cache warm",
        ]
        .iter()
        .enumerate()
        .map(|(i, raw)| auto.parse_line(i + 1, raw))
        .collect();
        let rules = vec![
            FilterRule::substring(FilterKind::Include, "ERROR"),
            FilterRule::substring(FilterKind::Exclude, "Timeout"),
        ];
        assert_eq!(evaluate(&recs, &rules), vec![0]);
    }

    #[test]
    fn disabled_rules_are_ignored() {
        let recs = records();
        let mut rule = FilterRule::substring(FilterKind::Exclude, "2024");
        rule.enabled = false;
        assert_eq!(evaluate(&recs, &[rule]), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn substring_is_case_insensitive_by_default() {
        let recs = records();
        let rules = vec![FilterRule::substring(FilterKind::Include, "DATABASE")];
        assert_eq!(evaluate(&recs, &rules), vec![0]);

        let sensitive = vec![FilterRule::new(
            FilterKind::Include,
            MatchMode::Substring {
                pattern: "DATABASE".to_string(),
                case_sensitive: true,
            },
        )];
        assert!(evaluate(&recs, &sensitive).is_empty());
    }

    #[test]
    fn regex_rule() {
        let recs = records();
        let rules = vec![FilterRule::regex(FilterKind::Include, r"conn\w+ failed").unwrap()];
        assert_eq!(evaluate(&recs, &rules), vec![0]);
        assert!(FilterRule::regex(FilterKind::Include, "(unclosed").is_err());
    }

    #[test]
    fn field_rule_string_form_compare() {
        let recs = records();
        let rules = vec![FilterRule::new(
            FilterKind::Include,
            MatchMode::Field {
                path: "level".to_string(),
                value: "warn".to_string(),
            },
        )];
        assert_eq!(evaluate(&recs, &rules), vec![2]);
    }

    #[test]
    fn component_rule_exact() {
        let recs = records();
        let rules = vec![FilterRule::new(
            FilterKind::Include,
            MatchMode::Component("auth".to_string()),
        )];
        assert_eq!(evaluate(&recs, &rules), vec![2]);
        let partial = vec![FilterRule::new(
            FilterKind::Include,
            MatchMode::Component("aut".to_string()),
        )];
        assert!(evaluate(&recs, &partial).is_empty());
    }

    #[test]
    fn time_range_half_open() {
        let recs = records();
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 2).unwrap();
        let rules = vec![FilterRule::new(
            FilterKind::Include,
            MatchMode::TimeRange { start, end },
        )];
        // end is exclusive, timestamp-less record never matches
        assert_eq!(evaluate(&recs, &rules), vec![0, 1]);
    }

    #[test]
    fn batch_agrees_with_single_record_check() {
        let recs = records();
        let rules = vec![
            FilterRule::substring(FilterKind::Include, "2024"),
            FilterRule::substring(FilterKind::Exclude, "cache"),
        ];
        let batch = evaluate(&recs, &rules);
        for (idx, record) in recs.iter().enumerate() {
            assert_eq!(batch.contains(&idx), check(record, &rules));
        }
    }
}
