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

//! Query layer over parsed records: filtering, search, multi-source
//! merging, and the windowed view projection.

pub mod filter;
pub mod search;
pub mod store;
pub mod view;

pub use filter::{FilterKind, FilterRule, MatchMode};
pub use search::{SearchMatch, SearchPattern, SearchPatternSet, SearchQuery};
pub use view::ViewModel;
