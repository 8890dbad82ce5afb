//! Per-resource accumulator for a burst of edits

use crate::types::{EditTotals, RawChange};
use chrono::{DateTime, Utc};

/// In-progress aggregate of changes to one resource
///
/// Only the aggregation table creates and mutates these. `changes` is never
/// empty and `last_seen >= first_seen`.
#[derive(Debug, Clone)]
pub struct AggregatedEdit {
    /// Resource identifier (usually a filesystem path)
    pub resource: String,

    /// Host language tag
    pub language: String,

    /// Retained changes in arrival order
    pub changes: Vec<RawChange>,

    /// When the first change of the burst arrived
    pub first_seen: DateTime<Utc>,

    /// When the most recent change arrived
    pub last_seen: DateTime<Utc>,

    /// Running size totals
    pub totals: EditTotals,
}

impl AggregatedEdit {
    /// Start a new aggregate seeded with its first change
    pub fn new(resource: &str, language: &str, change: RawChange, at: DateTime<Utc>) -> Self {
        let mut totals = EditTotals::default();
        totals.record(&change);

        Self {
            resource: resource.to_string(),
            language: language.to_string(),
            changes: vec![change],
            first_seen: at,
            last_seen: at,
            totals,
        }
    }

    /// Append a change and fold it into the running totals
    pub fn push(&mut self, change: RawChange, at: DateTime<Utc>) {
        self.totals.record(&change);
        self.changes.push(change);
        if at > self.last_seen {
            self.last_seen = at;
        }
    }

    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Inserted text of every retained change, concatenated in arrival order
    pub fn combined_text(&self) -> String {
        self.changes.iter().map(|c| c.text.as_str()).collect()
    }

    /// Burst length in milliseconds
    pub fn duration_ms(&self) -> u64 {
        (self.last_seen - self.first_seen)
            .num_milliseconds()
            .max(0) as u64
    }

    /// First and last line touched (1-based, inclusive)
    pub fn line_span(&self) -> (u32, u32) {
        let mut first = u32::MAX;
        let mut last = 0;
        for change in &self.changes {
            let start = change.line.max(1);
            let inserted = u32::try_from(change.inserted_lines()).unwrap_or(u32::MAX);
            let end = start.saturating_add(inserted);
            first = first.min(start);
            last = last.max(end);
        }
        (first.min(last), last)
    }
}
