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

//! Windowed projection of the record store.
//!
//! The view owns the append-only record sequence and derives the visible
//! subset (filter rules, then severity floor, then anomaly-only), per-row
//! display heights, and their prefix-sum offsets. Criteria changes rebuild
//! the projection in one O(n) pass; appends take an O(1) incremental path
//! through the same single-record check the rebuild uses.

use ahash::AHashMap;

use crate::core::filter::{self, FilterRule};
use crate::parser::{ContentType, LogRecord, Severity};

/// Display height of an expanded plain-text record (raw line + content line).
const EXPANDED_TEXT_HEIGHT: usize = 2;

pub struct ViewModel {
    records: Vec<LogRecord>,
    rules: Vec<FilterRule>,
    min_severity: Option<Severity>,
    anomaly_only: bool,
    anomaly_scores: AHashMap<usize, f64>,
    expanded: bool,
    /// Indices into `records`, ascending.
    visible: Vec<usize>,
    /// Display height per visible row.
    heights: Vec<usize>,
    /// Prefix sums: display row where each visible row starts.
    offsets: Vec<usize>,
    /// Cursor as an index into `visible`.
    cursor: Option<usize>,
}

impl ViewModel {
    pub fn new(records: Vec<LogRecord>) -> Self {
        let mut view = ViewModel {
            records,
            rules: Vec::new(),
            min_severity: None,
            anomaly_only: false,
            anomaly_scores: AHashMap::new(),
            expanded: false,
            visible: Vec::new(),
            heights: Vec::new(),
            offsets: Vec::new(),
            cursor: None,
        };
        view.rebuild();
        view
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn total_len(&self) -> usize {
        self.records.len()
    }

    pub fn record_at(&self, visible_row: usize) -> Option<&LogRecord> {
        self.records.get(*self.visible.get(visible_row)?)
    }

    pub fn anomaly_score(&self, record_index: usize) -> Option<f64> {
        self.anomaly_scores.get(&record_index).copied()
    }

    // ---- Criteria; each change rebuilds the projection ----

    pub fn set_rules(&mut self, rules: Vec<FilterRule>) {
        self.rules = rules;
        self.rebuild();
    }

    pub fn rules(&self) -> &[FilterRule] {
        &self.rules
    }

    /// Severity floor. Records without a severity are excluded while a
    /// floor is set.
    pub fn set_min_severity(&mut self, min: Option<Severity>) {
        self.min_severity = min;
        self.rebuild();
    }

    pub fn set_anomaly_only(&mut self, on: bool) {
        self.anomaly_only = on;
        self.rebuild();
    }

    /// Per-record anomaly scores from the detector, keyed by record index.
    pub fn set_anomaly_scores(&mut self, scores: AHashMap<usize, f64>) {
        self.anomaly_scores = scores;
        if self.anomaly_only {
            self.rebuild();
        }
    }

    /// Toggle expanded rendering (pretty-printed structured content).
    pub fn set_expanded(&mut self, on: bool) {
        if self.expanded != on {
            self.expanded = on;
            self.reflow();
        }
    }

    // ---- Projection ----

    fn passes(&self, index: usize, record: &LogRecord) -> bool {
        if !filter::check(record, &self.rules) {
            return false;
        }
        if let Some(min) = self.min_severity {
            match record.severity {
                Some(sev) if sev >= min => {}
                _ => return false,
            }
        }
        if self.anomaly_only && !self.anomaly_scores.contains_key(&index) {
            return false;
        }
        true
    }

    fn row_height(&self, record: &LogRecord) -> usize {
        if !self.expanded {
            return 1;
        }
        match (record.content_type, &record.structured) {
            (ContentType::Structured, Some(map)) => {
                match serde_json::to_string_pretty(map) {
                    Ok(pretty) => pretty.lines().count(),
                    Err(_) => 1,
                }
            }
            _ => EXPANDED_TEXT_HEIGHT,
        }
    }

    /// Recompute the visible set and row geometry in one pass, keeping the
    /// cursor on the same underlying record where possible.
    pub fn rebuild(&mut self) {
        let remembered = self.cursor.and_then(|row| self.visible.get(row)).copied();

        self.visible.clear();
        self.heights.clear();
        self.offsets.clear();
        let mut offset = 0;
        for (index, record) in self.records.iter().enumerate() {
            if !self.passes(index, record) {
                continue;
            }
            let height = self.row_height(record);
            self.visible.push(index);
            self.heights.push(height);
            self.offsets.push(offset);
            offset += height;
        }

        self.cursor = match remembered {
            Some(record_index) => {
                if self.visible.is_empty() {
                    None
                } else {
                    // First still-visible row at or past the old record,
                    // else the last row.
                    let row = self.visible.partition_point(|&i| i < record_index);
                    Some(row.min(self.visible.len() - 1))
                }
            }
            None => None,
        };
    }

    /// Recompute heights and offsets only; visibility is unchanged.
    fn reflow(&mut self) {
        let mut offset = 0;
        for (row, &index) in self.visible.iter().enumerate() {
            let height = self.row_height(&self.records[index]);
            self.heights[row] = height;
            self.offsets[row] = offset;
            offset += height;
        }
    }

    /// Append one record, extending the projection without a rebuild.
    pub fn append(&mut self, record: LogRecord) {
        let index = self.records.len();
        let passes = self.passes(index, &record);
        let height = self.row_height(&record);
        let offset = self.total_height();
        self.records.push(record);
        if passes {
            self.visible.push(index);
            self.heights.push(height);
            self.offsets.push(offset);
        }
    }

    /// Total display rows spanned by the visible records.
    pub fn total_height(&self) -> usize {
        match (self.offsets.last(), self.heights.last()) {
            (Some(offset), Some(height)) => offset + height,
            _ => 0,
        }
    }

    /// Map a display row to `(visible_row, sub_row)`.
    pub fn locate(&self, display_row: usize) -> Option<(usize, usize)> {
        if display_row >= self.total_height() {
            return None;
        }
        // Last visible row starting at or before display_row
        let row = self.offsets.partition_point(|&o| o <= display_row) - 1;
        Some((row, display_row - self.offsets[row]))
    }

    // ---- Cursor ----

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Underlying record index under the cursor.
    pub fn cursor_record(&self) -> Option<usize> {
        self.visible.get(self.cursor?).copied()
    }

    pub fn set_cursor(&mut self, visible_row: usize) {
        if visible_row < self.visible.len() {
            self.cursor = Some(visible_row);
        }
    }

    // ---- Tallies ----

    /// Visible record count per severity. Records without a severity are
    /// not counted.
    pub fn level_counts(&self) -> AHashMap<Severity, usize> {
        let mut counts = AHashMap::new();
        for &index in &self.visible {
            if let Some(sev) = self.records[index].severity {
                *counts.entry(sev).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::{FilterKind, FilterRule};
    use crate::parser::{Auto, Recognize};

    fn view(lines: &[&str]) -> ViewModel {
        let auto = Auto::new();
        ViewModel::new(
            lines
                .iter()
                .enumerate()
                .map(|(i, raw)| auto.parse_line(i + 1, raw))
                .collect(),
        )
    }

    fn sample() -> ViewModel {
        view(&[
            "2024-01-15T10:30:00Z ERROR db connection failed",
            "2024-01-15T10:30:01Z INFO request handled",
            "2024-01-15T10:30:02Z WARN slow query",
            "untimestamped noise",
            "2024-01-15T10:30:03Z ERROR db connection failed",
        ])
    }

    #[test]
    fn everything_visible_by_default() {
        let v = sample();
        assert_eq!(v.visible(), &[0, 1, 2, 3, 4]);
        assert_eq!(v.total_height(), 5);
    }

    #[test]
    fn severity_floor_excludes_unset() {
        let mut v = sample();
        v.set_min_severity(Some(Severity::Warn));
        // rows 0, 2, 4; row 3 has no severity and is dropped
        assert_eq!(v.visible(), &[0, 2, 4]);
        v.set_min_severity(None);
        assert_eq!(v.visible(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn filter_and_severity_combine() {
        let mut v = sample();
        v.set_rules(vec![FilterRule::substring(FilterKind::Include, "db")]);
        v.set_min_severity(Some(Severity::Error));
        assert_eq!(v.visible(), &[0, 4]);
    }

    #[test]
    fn anomaly_only_uses_score_map() {
        let mut v = sample();
        let mut scores = AHashMap::new();
        scores.insert(2usize, 1.0);
        v.set_anomaly_scores(scores);
        v.set_anomaly_only(true);
        assert_eq!(v.visible(), &[2]);
        assert_eq!(v.anomaly_score(2), Some(1.0));
    }

    #[test]
    fn append_matches_full_rebuild() {
        let mut v = sample();
        v.set_rules(vec![FilterRule::substring(FilterKind::Include, "db")]);
        let auto = Auto::new();
        v.append(auto.parse_line(6, "2024-01-15T10:30:04Z ERROR db gone"));
        v.append(auto.parse_line(7, "2024-01-15T10:30:05Z INFO unrelated"));

        let appended_visible = v.visible().to_vec();
        let appended_height = v.total_height();
        v.rebuild();
        assert_eq!(v.visible(), appended_visible.as_slice());
        assert_eq!(v.total_height(), appended_height);
        assert_eq!(v.visible(), &[0, 4, 5]);
    }

    #[test]
    fn expanded_structured_heights() {
        let mut v = view(&[
            "2024-01-15T10:30:00Z plain text line",
            r#"2024-01-15T10:30:01Z {"a": 1, "b": 2}"#,
        ]);
        assert_eq!(v.total_height(), 2);
        v.set_expanded(true);
        // text: 2 rows; structured: pretty-printed {"a": 1, "b": 2} is 4 lines
        assert_eq!(v.total_height(), 2 + 4);
    }

    #[test]
    fn locate_maps_display_rows() {
        let mut v = view(&[
            "2024-01-15T10:30:00Z one",
            r#"2024-01-15T10:30:01Z {"a": 1}"#,
            "2024-01-15T10:30:02Z three",
        ]);
        v.set_expanded(true);
        // heights: 2 (text), 3 (pretty {"a": 1}), 2 (text)
        assert_eq!(v.locate(0), Some((0, 0)));
        assert_eq!(v.locate(1), Some((0, 1)));
        assert_eq!(v.locate(2), Some((1, 0)));
        assert_eq!(v.locate(4), Some((1, 2)));
        assert_eq!(v.locate(5), Some((2, 0)));
        assert_eq!(v.locate(7), None);
    }

    #[test]
    fn cursor_survives_rule_change() {
        let mut v = sample();
        v.set_cursor(2); // record index 2, the WARN line
        v.set_min_severity(Some(Severity::Warn));
        // record 2 still visible, now at visible row 1
        assert_eq!(v.cursor_record(), Some(2));
        assert_eq!(v.cursor(), Some(1));
    }

    #[test]
    fn cursor_moves_to_next_visible_when_hidden() {
        let mut v = sample();
        v.set_cursor(1); // record 1, INFO
        v.set_min_severity(Some(Severity::Warn));
        // record 1 hidden; first visible record >= 1 is record 2
        assert_eq!(v.cursor_record(), Some(2));
    }

    #[test]
    fn cursor_clamps_to_last_visible() {
        let mut v = sample();
        v.set_cursor(4); // record 4
        v.set_rules(vec![FilterRule::substring(FilterKind::Include, "request")]);
        // only record 1 remains
        assert_eq!(v.cursor_record(), Some(1));
    }

    #[test]
    fn level_counts_follow_visibility() {
        let mut v = sample();
        let all = v.level_counts();
        assert_eq!(all.get(&Severity::Error), Some(&2));
        assert_eq!(all.get(&Severity::Info), Some(&1));
        assert_eq!(all.get(&Severity::Warn), Some(&1));

        v.set_rules(vec![FilterRule::substring(FilterKind::Exclude, "db")]);
        let filtered = v.level_counts();
        assert_eq!(filtered.get(&Severity::Error), None);
        assert_eq!(filtered.get(&Severity::Info), Some(&1));
    }
}
