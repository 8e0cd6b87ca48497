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

//! Multi-pattern search with slot-colored highlights and navigation.

use fancy_regex::Regex;

use crate::parser::LogRecord;

/// Highlight slots available before pattern additions are refused.
pub const MAX_PATTERNS: usize = 10;

/// One search input as the user typed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub case_sensitive: bool,
    pub is_regex: bool,
}

impl SearchQuery {
    pub fn literal(text: impl Into<String>) -> Self {
        SearchQuery {
            text: text.into(),
            case_sensitive: false,
            is_regex: false,
        }
    }

    pub fn regex(text: impl Into<String>) -> Self {
        SearchQuery {
            text: text.into(),
            case_sensitive: false,
            is_regex: true,
        }
    }
}

/// One hit: record index plus byte span into the raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub record_index: usize,
    pub start: usize,
    pub end: usize,
    pub slot: usize,
}

/// All spans matching the query, ordered by `(record_index, start)`.
///
/// Literal searches advance one character past each match start, so
/// overlapping hits are reported ("xx" in "xxx" hits 0 and 1). An empty
/// pattern and an invalid regex both yield zero matches.
pub fn find_matches(records: &[LogRecord], query: &SearchQuery) -> Vec<(usize, usize, usize)> {
    if query.text.is_empty() {
        return Vec::new();
    }
    if query.is_regex {
        let pattern = if query.case_sensitive {
            query.text.clone()
        } else {
            format!("(?i){}", query.text)
        };
        let Ok(re) = Regex::new(&pattern) else {
            // Fail closed while the user is mid-edit
            return Vec::new();
        };
        let mut out = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            for m in re.find_iter(&record.raw).flatten() {
                out.push((idx, m.start(), m.end()));
            }
        }
        return out;
    }

    let needle = if query.case_sensitive {
        query.text.clone()
    } else {
        query.text.to_lowercase()
    };
    let mut out = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        // Every char boundary is a candidate start, so overlapping
        // matches ("xx" in "xxx") are all reported. Spans stay in raw
        // byte coordinates even where case folding changes byte length.
        for (start, _) in record.raw.char_indices() {
            if query.case_sensitive {
                if record.raw[start..].starts_with(needle.as_str()) {
                    out.push((idx, start, start + needle.len()));
                }
            } else if let Some(end) = folded_match_end(&record.raw, start, &needle) {
                out.push((idx, start, end));
            }
        }
    }
    out
}

/// Case-insensitive prefix match of `needle` (already lowercased) against
/// `raw[start..]`, folding one haystack char at a time. Returns the end
/// byte offset in `raw`, which is always a char boundary; a haystack char
/// whose folding only partially covers the needle's tail is no match.
fn folded_match_end(raw: &str, start: usize, needle: &str) -> Option<usize> {
    let mut wanted = needle.chars();
    let mut next_wanted = wanted.next();
    for (offset, ch) in raw[start..].char_indices() {
        if next_wanted.is_none() {
            return Some(start + offset);
        }
        for folded in ch.to_lowercase() {
            match next_wanted {
                Some(expected) if folded == expected => next_wanted = wanted.next(),
                _ => return None,
            }
        }
    }
    if next_wanted.is_none() {
        Some(raw.len())
    } else {
        None
    }
}

/// A registered search pattern with its highlight slot.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    pub query: SearchQuery,
    pub highlight_enabled: bool,
    pub is_navigation_target: bool,
    pub slot: usize,
}

/// Bounded set of concurrent search patterns.
///
/// Slots are color indices: each new pattern takes the lowest free slot,
/// removal frees it for reuse. Exactly one pattern is the navigation
/// target at a time (the most recently added, unless retargeted).
#[derive(Debug, Default)]
pub struct SearchPatternSet {
    patterns: Vec<SearchPattern>,
}

impl SearchPatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern. Returns its slot, or `None` when all
    /// [`MAX_PATTERNS`] slots are taken.
    pub fn add(&mut self, query: SearchQuery) -> Option<usize> {
        let slot = (0..MAX_PATTERNS).find(|s| !self.patterns.iter().any(|p| p.slot == *s))?;
        for p in &mut self.patterns {
            p.is_navigation_target = false;
        }
        self.patterns.push(SearchPattern {
            query,
            highlight_enabled: true,
            is_navigation_target: true,
            slot,
        });
        Some(slot)
    }

    /// Remove the pattern in `slot`, freeing it. The newest remaining
    /// pattern becomes the navigation target if the removed one was.
    pub fn remove(&mut self, slot: usize) {
        let Some(pos) = self.patterns.iter().position(|p| p.slot == slot) else {
            return;
        };
        let was_target = self.patterns[pos].is_navigation_target;
        self.patterns.remove(pos);
        if was_target {
            if let Some(last) = self.patterns.last_mut() {
                last.is_navigation_target = true;
            }
        }
    }

    /// Make the pattern in `slot` the navigation target.
    pub fn set_navigation_target(&mut self, slot: usize) {
        if !self.patterns.iter().any(|p| p.slot == slot) {
            return;
        }
        for p in &mut self.patterns {
            p.is_navigation_target = p.slot == slot;
        }
    }

    pub fn patterns(&self) -> &[SearchPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Run every highlight-enabled pattern and merge the hits, sorted by
    /// `(record_index, start)`.
    pub fn find_all(&self, records: &[LogRecord]) -> Vec<SearchMatch> {
        let mut out: Vec<SearchMatch> = Vec::new();
        for pattern in self.patterns.iter().filter(|p| p.highlight_enabled) {
            out.extend(find_matches(records, &pattern.query).into_iter().map(
                |(record_index, start, end)| SearchMatch {
                    record_index,
                    start,
                    end,
                    slot: pattern.slot,
                },
            ));
        }
        out.sort_by_key(|m| (m.record_index, m.start, m.end, m.slot));
        out
    }

    /// Matches of the navigation target only, in document order.
    pub fn navigation_matches(&self, records: &[LogRecord]) -> Vec<SearchMatch> {
        let Some(target) = self.patterns.iter().find(|p| p.is_navigation_target) else {
            return Vec::new();
        };
        find_matches(records, &target.query)
            .into_iter()
            .map(|(record_index, start, end)| SearchMatch {
                record_index,
                start,
                end,
                slot: target.slot,
            })
            .collect()
    }
}

/// Next match strictly after `(record_index, start)`, wrapping to the first.
pub fn next_match(matches: &[SearchMatch], record_index: usize, start: usize) -> Option<&SearchMatch> {
    matches
        .iter()
        .find(|m| (m.record_index, m.start) > (record_index, start))
        .or_else(|| matches.first())
}

/// Previous match strictly before `(record_index, start)`, wrapping to the last.
pub fn prev_match(matches: &[SearchMatch], record_index: usize, start: usize) -> Option<&SearchMatch> {
    matches
        .iter()
        .rev()
        .find(|m| (m.record_index, m.start) < (record_index, start))
        .or_else(|| matches.last())
}

/// Resolve overlapping highlight spans to one slot per character.
///
/// Spans are painted longest first, so when two overlap, the shorter
/// (more specific) one overwrites the longer on the shared characters.
/// Equal lengths tie-break by span position then slot, deterministically.
pub fn paint_spans(len: usize, spans: &[SearchMatch]) -> Vec<Option<usize>> {
    let mut cells: Vec<Option<usize>> = vec![None; len];
    let mut ordered: Vec<&SearchMatch> = spans.iter().collect();
    ordered.sort_by_key(|m| (std::cmp::Reverse(m.end - m.start), m.start, m.slot));
    for span in ordered {
        for cell in cells.iter_mut().take(span.end.min(len)).skip(span.start) {
            *cell = Some(span.slot);
        }
    }
    cells
}
