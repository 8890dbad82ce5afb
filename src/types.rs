//! Core data types for the episodic pipeline
//!
//! This module defines the values that flow through the pipeline: raw host
//! edits on the way in, running totals while a burst is hot, and the immutable
//! episode record that leaves for the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Provenance tag written on records produced by the edit aggregator
pub const EDIT_AGGREGATOR_PROVENANCE: &str = "edit_aggregator";

/// One host-reported edit
///
/// The resource identifier and language tag are supplied alongside the change
/// by the host (see [`crate::EpisodePipeline::on_change`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChange {
    /// Character offset of the edit in the resource
    pub offset: usize,

    /// Length of the span removed by the edit
    #[serde(default)]
    pub removed_len: usize,

    /// Text inserted by the edit
    #[serde(default)]
    pub text: String,

    /// 1-based line number where the edit starts
    #[serde(default = "default_line")]
    pub line: u32,
}

fn default_line() -> u32 {
    1
}

impl RawChange {
    /// Pure insertion of `text` at `offset`
    pub fn insert(offset: usize, line: u32, text: impl Into<String>) -> Self {
        Self {
            offset,
            removed_len: 0,
            text: text.into(),
            line,
        }
    }

    /// Pure deletion of `len` characters at `offset`
    pub fn delete(offset: usize, line: u32, len: usize) -> Self {
        Self {
            offset,
            removed_len: len,
            text: String::new(),
            line,
        }
    }

    /// Replacement of `len` characters at `offset` with `text`
    pub fn replace(offset: usize, line: u32, len: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            removed_len: len,
            text: text.into(),
            line,
        }
    }

    /// Number of newline characters in the inserted text
    pub fn inserted_lines(&self) -> usize {
        self.text.matches('\n').count()
    }

    /// Number of characters in the inserted text
    pub fn inserted_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Classification of one aggregated burst of edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Addition,
    Deletion,
    Modification,
    Refactor,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Addition => "addition",
            ChangeKind::Deletion => "deletion",
            ChangeKind::Modification => "modification",
            ChangeKind::Refactor => "refactor",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running size totals for an aggregate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditTotals {
    pub lines_added: usize,
    /// Approximate: one line per change that removed text
    pub lines_deleted: usize,
    pub chars_added: usize,
    pub chars_deleted: usize,
}

impl EditTotals {
    /// Fold one change into the totals
    pub fn record(&mut self, change: &RawChange) {
        self.lines_added += change.inserted_lines();
        self.chars_added += change.inserted_chars();
        if change.removed_len > 0 {
            self.chars_deleted += change.removed_len;
            self.lines_deleted += 1;
        }
    }

    /// Lines added plus lines deleted
    pub fn changed_lines(&self) -> usize {
        self.lines_added + self.lines_deleted
    }
}

/// Unique identifier for episode records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(pub Uuid);

impl EpisodeId {
    /// Create a new random episode ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an episode ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What caused an aggregate to be flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushTrigger {
    /// Debounce window expired with no further edits
    Debounce,
    /// Host reported a save of the resource
    Save,
    /// Pipeline shutdown drained every hot resource
    Shutdown,
}

/// Lines surrounding the edited region, read from the live resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeContext {
    pub before: String,
    pub after: String,
}

impl EpisodeContext {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

/// Immutable summary of one coherent unit of editing activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Unique identifier
    pub id: EpisodeId,

    /// Path (or host identifier) of the edited resource
    pub resource: String,

    /// Host language tag of the resource
    pub language: String,

    /// When the episode was flushed
    pub timestamp: DateTime<Utc>,

    /// Time between the first and last edit of the burst (milliseconds)
    pub duration_ms: u64,

    /// Classification of the burst
    pub change_kind: ChangeKind,

    /// De-duplicated lexical pattern tags
    pub patterns: BTreeSet<String>,

    /// Size totals
    #[serde(flatten)]
    pub totals: EditTotals,

    /// Number of retained changes in the burst
    pub change_count: usize,

    /// First and last line touched by the burst (1-based)
    pub first_line: u32,
    pub last_line: u32,

    /// Importance score (0.0 - 0.9)
    pub importance: f32,

    /// Surrounding context, `None` when context capture is disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<EpisodeContext>,

    /// What caused the flush
    pub trigger: FlushTrigger,

    /// Subsystem that produced the record
    pub provenance: String,

    /// One-line human readable description
    pub summary: String,
}

impl EpisodeRecord {
    /// Whether a given pattern tag was detected
    pub fn has_pattern(&self, tag: &str) -> bool {
        self.patterns.contains(tag)
    }
}
