//! Episode construction
//!
//! Turns one flushed [`AggregatedEdit`] into an immutable [`EpisodeRecord`]:
//! classification, pattern tags, importance, and (optionally) a snippet of
//! the surrounding lines read from the live resource. The aggregation table
//! is never touched here.

use crate::analysis::{classify, detect_patterns, ImportanceScorer};
use crate::capture::AggregatedEdit;
use crate::config::PipelineConfig;
use crate::episode::context::extract_context;
use crate::types::{ChangeKind, EditTotals, EpisodeContext, EpisodeId, EpisodeRecord, FlushTrigger};
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::Path;

/// Builds episode records from flushed aggregates
#[derive(Debug, Clone)]
pub struct EpisodeBuilder {
    scorer: ImportanceScorer,
    context_lines: usize,
    max_context_chars: usize,
    provenance: String,
}

impl EpisodeBuilder {
    pub fn new(
        scorer: ImportanceScorer,
        context_lines: usize,
        max_context_chars: usize,
        provenance: impl Into<String>,
    ) -> Self {
        Self {
            scorer,
            context_lines,
            max_context_chars,
            provenance: provenance.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            ImportanceScorer::default(),
            config.context_lines,
            config.max_context_chars,
            config.provenance.clone(),
        )
    }

    /// Build a record, reading surrounding context from the resource
    pub async fn build(&self, edit: AggregatedEdit, trigger: FlushTrigger) -> EpisodeRecord {
        let context = if self.context_lines > 0 {
            let (first, last) = edit.line_span();
            Some(
                extract_context(
                    &edit.resource,
                    first,
                    last,
                    self.context_lines,
                    self.max_context_chars,
                )
                .await,
            )
        } else {
            None
        };

        self.assemble(edit, trigger, context)
    }

    /// Build a record from already-extracted context
    pub fn assemble(
        &self,
        edit: AggregatedEdit,
        trigger: FlushTrigger,
        context: Option<EpisodeContext>,
    ) -> EpisodeRecord {
        let change_kind = classify(&edit.totals);
        let patterns = detect_patterns(&edit.combined_text(), &edit.language);
        let importance = self.scorer.score(&edit.totals, &patterns, &edit.resource);
        let (first_line, last_line) = edit.line_span();
        let summary = summarize(&edit.resource, change_kind, &edit.totals, &patterns);

        EpisodeRecord {
            id: EpisodeId::new(),
            duration_ms: edit.duration_ms(),
            change_count: edit.change_count(),
            timestamp: Utc::now(),
            resource: edit.resource,
            language: edit.language,
            change_kind,
            patterns,
            totals: edit.totals,
            first_line,
            last_line,
            importance,
            context,
            trigger,
            provenance: self.provenance.clone(),
            summary,
        }
    }
}

/// `"<kind> in <file>: +A/-D lines [tag, tag]"`
fn summarize(
    resource: &str,
    kind: ChangeKind,
    totals: &EditTotals,
    patterns: &BTreeSet<String>,
) -> String {
    let name = Path::new(resource)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(resource);

    let mut summary = format!(
        "{} in {}: +{}/-{} lines",
        kind, name, totals.lines_added, totals.lines_deleted
    );
    if !patterns.is_empty() {
        let tags: Vec<&str> = patterns.iter().map(String::as_str).collect();
        summary.push_str(&format!(" [{}]", tags.join(", ")));
    }
    summary
}
