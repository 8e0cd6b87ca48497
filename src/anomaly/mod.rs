//! Baseline-referenced anomaly detection.
//!
//! Lines are reduced to templates by masking their variable parts, hashed,
//! and compared as populations: a current corpus against a previously
//! captured baseline corpus.

pub mod baseline;
pub mod detect;
pub mod template;

pub use baseline::{build_baseline, Baseline};
pub use detect::{detect, AnomalyReport};
pub use template::{
    build_template_groups, extract_template, record_template_hashes, template_hash,
    template_to_regex, TemplateGroup, TemplateHash,
};
