//! Baseline statistics captured from a reference corpus.

use ahash::{AHashMap, AHashSet};

use crate::anomaly::template::{build_template_groups, TemplateHash};
use crate::parser::LogRecord;

/// Template population of a known-good corpus. Built once, then read-only
/// while current logs are compared against it.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    pub hashes: AHashSet<TemplateHash>,
    pub counts: AHashMap<TemplateHash, usize>,
    pub total: usize,
}

pub fn build_baseline(records: &[LogRecord]) -> Baseline {
    let groups = build_template_groups(records);
    let mut baseline = Baseline {
        total: records.len(),
        ..Baseline::default()
    };
    for group in groups {
        baseline.hashes.insert(group.hash);
        baseline.counts.insert(group.hash, group.count);
    }
    baseline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Auto, Recognize};

    #[test]
    fn counts_by_template() {
        let auto = Auto::new();
        let records: Vec<LogRecord> = [
            "2024-01-15T10:30:00Z request 1 ok",
            "2024-01-15T10:30:01Z request 2 ok",
            "2024-01-15T10:30:02Z startup complete",
        ]
        .iter()
        .enumerate()
        .map(|(i, raw)| auto.parse_line(i + 1, raw))
        .collect();

        let baseline = build_baseline(&records);
        assert_eq!(baseline.total, 3);
        assert_eq!(baseline.hashes.len(), 2);
        assert!(baseline.counts.values().any(|&c| c == 2));
        assert!(baseline.counts.values().any(|&c| c == 1));
    }

    #[test]
    fn empty_corpus_empty_baseline() {
        let baseline = build_baseline(&[]);
        assert_eq!(baseline.total, 0);
        assert!(baseline.hashes.is_empty());
    }
}
