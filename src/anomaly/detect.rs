//! Comparison of a current corpus against a baseline.

use ahash::{AHashMap, AHashSet};

use crate::anomaly::baseline::Baseline;
use crate::anomaly::template::{build_template_groups, TemplateGroup, TemplateHash};
use crate::parser::LogRecord;

/// How many times over its baseline rate a template must run to count
/// as a spike, and the absolute count floor that keeps tiny samples from
/// spiking on noise.
const SPIKE_RATE_FACTOR: f64 = 5.0;
const SPIKE_MIN_COUNT: usize = 10;

/// Outcome of one baseline comparison.
///
/// `scores` maps record index to anomaly score: 1.0 for members of novel
/// templates, 0.5 for members of spiking ones. Records of known, normally
/// behaving templates carry no entry.
#[derive(Debug, Default)]
pub struct AnomalyReport {
    pub novel: Vec<TemplateGroup>,
    /// `(group, baseline_count, current_count)` per spiking template.
    pub spikes: Vec<(TemplateGroup, usize, usize)>,
    /// Baseline templates absent from the current corpus.
    pub disappeared: Vec<TemplateHash>,
    pub scores: AHashMap<usize, f64>,
    pub anomaly_count: usize,
}

/// Compare `records` against `baseline`.
///
/// A template absent from the baseline is novel; novel templates are
/// never also spikes. Known templates spike when their current rate
/// exceeds [`SPIKE_RATE_FACTOR`] times the baseline rate and their count
/// exceeds [`SPIKE_MIN_COUNT`].
pub fn detect(records: &[LogRecord], baseline: &Baseline) -> AnomalyReport {
    let mut report = AnomalyReport::default();
    let groups = build_template_groups(records);
    let mut current_hashes: AHashSet<TemplateHash> = AHashSet::with_capacity(groups.len());

    for group in groups {
        current_hashes.insert(group.hash);

        if !baseline.hashes.contains(&group.hash) {
            for &idx in &group.record_indices {
                report.scores.insert(idx, 1.0);
            }
            report.novel.push(group);
        } else if baseline.total > 0 {
            let baseline_count = baseline.counts.get(&group.hash).copied().unwrap_or(0);
            if baseline_count > 0 && !records.is_empty() {
                let baseline_rate = baseline_count as f64 / baseline.total as f64;
                let current_rate = group.count as f64 / records.len() as f64;
                if current_rate > baseline_rate * SPIKE_RATE_FACTOR
                    && group.count > SPIKE_MIN_COUNT
                {
                    for &idx in &group.record_indices {
                        let score = report.scores.entry(idx).or_insert(0.0);
                        *score = score.max(0.5);
                    }
                    let current_count = group.count;
                    report.spikes.push((group, baseline_count, current_count));
                }
            }
        }
    }

    report.disappeared = baseline
        .hashes
        .iter()
        .filter(|h| !current_hashes.contains(h))
        .copied()
        .collect();
    report.anomaly_count = report.scores.values().filter(|s| **s > 0.0).count();
    report
}
