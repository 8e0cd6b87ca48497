//! LogLens: an interactive log-inspection engine.
//!
//! Heterogeneous log streams are normalized into [`parser::LogRecord`]s,
//! then queried through the [`core`] layer (filter rules, multi-pattern
//! search, merged timelines, windowed views) and scored by the
//! [`anomaly`] layer against a baseline corpus. [`tail`] follows growing
//! files live.

pub mod anomaly;
pub mod core;
pub mod parser;
pub mod tail;

pub use crate::core::{FilterKind, FilterRule, MatchMode, SearchPatternSet, SearchQuery, ViewModel};
pub use crate::parser::{detect_format, Auto, LogRecord, Recognize, Severity};
