//! Best-effort context extraction from the live resource

use crate::types::EpisodeContext;
use std::path::Path;
use tracing::debug;

/// Truncate to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Slice `lines` lines before `first_line` and after `last_line` (1-based,
/// inclusive) out of `text`
pub fn context_from_text(
    text: &str,
    first_line: u32,
    last_line: u32,
    lines: usize,
    max_chars: usize,
) -> EpisodeContext {
    let all: Vec<&str> = text.lines().collect();
    let first_idx = (first_line.max(1) as usize - 1).min(all.len());
    let after_start = (last_line.max(first_line) as usize).min(all.len());

    let before_start = first_idx.saturating_sub(lines);
    let after_end = (after_start + lines).min(all.len());

    EpisodeContext {
        before: truncate_chars(&all[before_start..first_idx].join("\n"), max_chars),
        after: truncate_chars(&all[after_start..after_end].join("\n"), max_chars),
    }
}

/// Read surrounding lines from the resource on disk
///
/// Any read failure (deleted, renamed, unreadable, not UTF-8) yields empty
/// context rather than an error.
pub async fn extract_context(
    resource: &str,
    first_line: u32,
    last_line: u32,
    lines: usize,
    max_chars: usize,
) -> EpisodeContext {
    match tokio::fs::read_to_string(Path::new(resource)).await {
        Ok(text) => context_from_text(&text, first_line, last_line, lines, max_chars),
        Err(e) => {
            debug!("Context unavailable for {}: {}", resource, e);
            EpisodeContext::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "l1\nl2\nl3\nl4\nl5\nl6\nl7\nl8\nl9\nl10";

    #[test]
    fn test_context_around_region() {
        let ctx = context_from_text(TEXT, 5, 6, 3, 500);
        assert_eq!(ctx.before, "l2\nl3\nl4");
        assert_eq!(ctx.after, "l7\nl8\nl9");
    }

    #[test]
    fn test_context_at_file_edges() {
        let ctx = context_from_text(TEXT, 1, 1, 3, 500);
        assert_eq!(ctx.before, "");
        assert_eq!(ctx.after, "l2\nl3\nl4");

        let ctx = context_from_text(TEXT, 9, 10, 3, 500);
        assert_eq!(ctx.before, "l6\nl7\nl8");
        assert_eq!(ctx.after, "");
    }

    #[test]
    fn test_region_past_end_of_file() {
        let ctx = context_from_text(TEXT, 40, 42, 3, 500);
        assert_eq!(ctx.before, "l8\nl9\nl10");
        assert_eq!(ctx.after, "");
    }

    #[test]
    fn test_truncation() {
        let long = "x".repeat(600);
        let ctx = context_from_text(&format!("{long}\nedit\n{long}"), 2, 2, 3, 500);
        assert_eq!(ctx.before.chars().count(), 500);
        assert_eq!(ctx.after.chars().count(), 500);
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[tokio::test]
    async fn test_missing_resource_gives_empty_context() {
        let ctx = extract_context("/definitely/not/here.rs", 1, 1, 3, 500).await;
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn test_reads_live_resource() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        std::fs::write(&path, TEXT).unwrap();

        let ctx = extract_context(path.to_str().unwrap(), 4, 4, 1, 500).await;
        assert_eq!(ctx.before, "l3");
        assert_eq!(ctx.after, "l5");
    }
}
