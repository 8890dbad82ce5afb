//! Importance scoring for episodes
//!
//! Score = base 0.3, plus fixed increments for size, structural definitions,
//! tests, error handling, and recognized source files. Clamped to 0.9; the
//! range above is reserved for importance asserted by other subsystems.

use crate::analysis::patterns::{has_structural, tags};
use crate::types::EditTotals;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Extensions counted as source code
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "mjs", "cjs", "ts", "tsx", "go", "java", "kt", "scala", "c", "h",
    "cc", "cpp", "hpp", "cs", "rb", "php", "swift", "vue", "svelte",
];

/// Importance scoring weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceWeights {
    /// Starting score for every episode
    pub base: f32,

    /// Added when changed lines exceed `medium_lines`
    pub medium_size: f32,
    pub medium_lines: usize,

    /// Added on top when changed lines exceed `large_lines`
    pub large_size: f32,
    pub large_lines: usize,

    /// Structural definition detected
    pub structural: f32,

    /// Test code detected
    pub test: f32,

    /// Error handling detected
    pub error_handling: f32,

    /// Resource is a recognized source file
    pub source_file: f32,

    /// Upper bound of the score
    pub max: f32,
}

impl Default for ImportanceWeights {
    fn default() -> Self {
        Self {
            base: 0.3,
            medium_size: 0.1,
            medium_lines: 10,
            large_size: 0.1,
            large_lines: 50,
            structural: 0.15,
            test: 0.1,
            error_handling: 0.05,
            source_file: 0.05,
            max: 0.9,
        }
    }
}

/// Whether the resource extension is a recognized source extension
pub fn is_source_file(resource: &str) -> bool {
    Path::new(resource)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Deterministic importance scorer
#[derive(Debug, Clone, Default)]
pub struct ImportanceScorer {
    weights: ImportanceWeights,
}

impl ImportanceScorer {
    pub fn new(weights: ImportanceWeights) -> Self {
        Self { weights }
    }

    /// Score one episode
    pub fn score(&self, totals: &EditTotals, patterns: &BTreeSet<String>, resource: &str) -> f32 {
        let w = &self.weights;
        let mut score = w.base;

        let changed = totals.changed_lines();
        if changed > w.medium_lines {
            score += w.medium_size;
        }
        if changed > w.large_lines {
            score += w.large_size;
        }

        if has_structural(patterns) {
            score += w.structural;
        }
        if patterns.contains(tags::TEST) {
            score += w.test;
        }
        if patterns.contains(tags::ERROR_HANDLING) {
            score += w.error_handling;
        }
        if is_source_file(resource) {
            score += w.source_file;
        }

        score.min(w.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(added: usize) -> EditTotals {
        EditTotals {
            lines_added: added,
            chars_added: added * 10,
            ..Default::default()
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    const ALL_TAGS: &[&str] = &[
        tags::FUNCTION_DEFINITION,
        tags::CLASS_DEFINITION,
        tags::TYPE_DEFINITION,
        tags::TEST,
        tags::ERROR_HANDLING,
        tags::ASYNC_CODE,
        tags::IMPORT,
        tags::TODO,
    ];

    #[test]
    fn test_base_score() {
        let scorer = ImportanceScorer::default();
        let score = scorer.score(&lines(1), &BTreeSet::new(), "notes.txt");
        assert!((score - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_size_increments_are_cumulative() {
        let scorer = ImportanceScorer::default();
        let medium = scorer.score(&lines(11), &BTreeSet::new(), "notes.txt");
        let large = scorer.score(&lines(51), &BTreeSet::new(), "notes.txt");
        assert!((medium - 0.4).abs() < 1e-6);
        assert!((large - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_pattern_and_source_increments() {
        let scorer = ImportanceScorer::default();
        let score = scorer.score(
            &lines(1),
            &set(&[tags::FUNCTION_DEFINITION, tags::TEST, tags::ERROR_HANDLING]),
            "src/lib.rs",
        );
        // 0.3 + 0.15 + 0.1 + 0.05 + 0.05
        assert!((score - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_structural_counted_once() {
        let scorer = ImportanceScorer::default();
        let one = scorer.score(&lines(1), &set(&[tags::FUNCTION_DEFINITION]), "a.txt");
        let both = scorer.score(
            &lines(1),
            &set(&[tags::FUNCTION_DEFINITION, tags::CLASS_DEFINITION]),
            "a.txt",
        );
        assert_eq!(one, both);
    }

    #[test]
    fn test_clamped_to_max() {
        let scorer = ImportanceScorer::default();
        let score = scorer.score(&lines(500), &set(ALL_TAGS), "src/main.rs");
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_source_extension_detection() {
        assert!(is_source_file("src/main.rs"));
        assert!(is_source_file("/app/Component.TSX"));
        assert!(!is_source_file("README.md"));
        assert!(!is_source_file("Makefile"));
    }

    proptest! {
        #[test]
        fn prop_monotonic_in_lines(a in 0usize..200, b in 0usize..200) {
            let scorer = ImportanceScorer::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let patterns = BTreeSet::new();
            prop_assert!(scorer.score(&lines(lo), &patterns, "x.rs") <= scorer.score(&lines(hi), &patterns, "x.rs"));
        }

        #[test]
        fn prop_monotonic_in_patterns(
            mask in prop::collection::vec(any::<bool>(), ALL_TAGS.len()),
            extra in 0usize..ALL_TAGS.len(),
            changed in 0usize..100,
        ) {
            let scorer = ImportanceScorer::default();
            let subset: BTreeSet<String> = ALL_TAGS
                .iter()
                .zip(&mask)
                .filter(|(_, keep)| **keep)
                .map(|(tag, _)| tag.to_string())
                .collect();
            let mut superset = subset.clone();
            superset.insert(ALL_TAGS[extra].to_string());

            let small = scorer.score(&lines(changed), &subset, "a.py");
            let big = scorer.score(&lines(changed), &superset, "a.py");
            prop_assert!(small <= big);
            prop_assert!(big <= 0.9 + 1e-6);
        }
    }
}
