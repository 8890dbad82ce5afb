//! Pure analysis of aggregated edits: classification, pattern tags, importance

pub mod classifier;
pub mod importance;
pub mod patterns;

pub use classifier::classify;
pub use importance::{is_source_file, ImportanceScorer, ImportanceWeights};
pub use patterns::{detect_patterns, tags, LanguageFamily};
