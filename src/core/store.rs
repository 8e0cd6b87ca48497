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

//! Multi-source record merging.

use crate::parser::LogRecord;

/// Merge several parsed sources into one timeline.
///
/// Records keep their `source_line_number`; records without a component
/// are tagged with their source's name so interleaved lines stay
/// attributable. The merge sorts by timestamp (stable, so same-timestamp
/// and timestamp-less records keep their source order, timestamp-less
/// first) and renumbers `line_number` from 1.
pub fn merge_sources(sources: Vec<(String, Vec<LogRecord>)>) -> Vec<LogRecord> {
    let mut merged: Vec<LogRecord> = Vec::with_capacity(
        sources.iter().map(|(_, records)| records.len()).sum(),
    );
    for (name, records) in sources {
        for mut record in records {
            if record.component.is_none() {
                record.component = Some(name.clone());
            }
            merged.push(record);
        }
    }
    // Option<DateTime> orders None first, which is what we want for
    // timestamp-less records.
    merged.sort_by_key(|r| r.timestamp);
    for (idx, record) in merged.iter_mut().enumerate() {
        record.line_number = idx + 1;
    }
    merged
}
