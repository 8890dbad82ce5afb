//! Resource exclusion policy
//!
//! Consulted before any raw change is admitted. Build output, dependency
//! trees, version-control internals, minified bundles, lock files and the
//! pipeline's own store directory never produce episodes.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Predicate deciding whether edits to a resource are ignored
pub trait ResourceFilter: Send + Sync {
    fn is_excluded(&self, resource: &str) -> bool;
}

const BUILTIN_PATTERNS: &[&str] = &[
    // Dependency, build and VCS directories
    r"(^|[/\\])(node_modules|\.git|\.hg|\.svn|target|dist|build|out|vendor|__pycache__|\.venv|venv|\.next|\.nuxt|coverage|\.cache)([/\\]|$)",
    // Minified bundles and source maps
    r"\.min\.(js|css)$",
    r"\.(js|css)\.map$",
    // Lock files
    r"(^|[/\\])(package-lock\.json|yarn\.lock|pnpm-lock\.yaml|Cargo\.lock|poetry\.lock|Pipfile\.lock|composer\.lock|Gemfile\.lock|go\.sum)$",
    r"\.lock$",
];

static BUILTIN: Lazy<Vec<Regex>> = Lazy::new(|| compile_patterns(BUILTIN_PATTERNS.iter().copied()));

fn compile_patterns<'a>(patterns: impl Iterator<Item = &'a str>) -> Vec<Regex> {
    patterns
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Skipping invalid exclusion pattern {:?}: {}", p, e);
                None
            }
        })
        .collect()
}

/// Path-pattern based exclusion filter
#[derive(Debug, Clone, Default)]
pub struct PathExclusions {
    extra: Vec<Regex>,
    store_dir: Option<PathBuf>,
}

impl PathExclusions {
    /// Create a filter with extra regexes and the store directory to protect
    pub fn new(extra_patterns: &[String], store_dir: Option<&Path>) -> Self {
        Self {
            extra: compile_patterns(extra_patterns.iter().map(String::as_str)),
            store_dir: store_dir.map(Path::to_path_buf),
        }
    }
}

impl ResourceFilter for PathExclusions {
    fn is_excluded(&self, resource: &str) -> bool {
        if let Some(store) = &self.store_dir {
            if Path::new(resource).starts_with(store) {
                return true;
            }
        }

        BUILTIN.iter().chain(self.extra.iter()).any(|re| re.is_match(resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_directories_excluded() {
        let filter = PathExclusions::default();
        assert!(filter.is_excluded("/work/app/node_modules/react/index.js"));
        assert!(filter.is_excluded("/work/app/.git/HEAD"));
        assert!(filter.is_excluded("/work/crate/target/debug/build.rs"));
        assert!(filter.is_excluded("dist/bundle.js"));
        assert!(filter.is_excluded(r"C:\work\app\node_modules\x.js"));
    }

    #[test]
    fn test_minified_and_lock_files_excluded() {
        let filter = PathExclusions::default();
        assert!(filter.is_excluded("/work/app/static/app.min.js"));
        assert!(filter.is_excluded("/work/app/static/app.min.css"));
        assert!(filter.is_excluded("/work/app/package-lock.json"));
        assert!(filter.is_excluded("/work/crate/Cargo.lock"));
        assert!(filter.is_excluded("/work/app/yarn.lock"));
    }

    #[test]
    fn test_source_files_admitted() {
        let filter = PathExclusions::default();
        assert!(!filter.is_excluded("/work/app/src/main.rs"));
        assert!(!filter.is_excluded("/work/app/src/builder.ts"));
        assert!(!filter.is_excluded("/work/app/targets.md"));
        assert!(!filter.is_excluded("a.txt"));
    }

    #[test]
    fn test_store_dir_excluded() {
        let filter = PathExclusions::new(&[], Some(Path::new("/home/me/.episodic")));
        assert!(filter.is_excluded("/home/me/.episodic/2024-01-01/abc.json"));
        assert!(!filter.is_excluded("/home/me/project/src/lib.rs"));
    }

    #[test]
    fn test_extra_patterns() {
        let filter = PathExclusions::new(&[r"\.generated\.".to_string()], None);
        assert!(filter.is_excluded("/work/api.generated.ts"));
        assert!(!filter.is_excluded("/work/api.ts"));
    }

    #[test]
    fn test_invalid_extra_pattern_is_skipped() {
        let filter = PathExclusions::new(&["[broken".to_string()], None);
        assert!(!filter.is_excluded("/work/src/lib.rs"));
    }
}
