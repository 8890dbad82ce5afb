//! Aggregation activity statistics
//!
//! Updated once per flushed episode, independent of whether the record is
//! later persisted successfully. Readers get sorted top-N views and a fixed
//! 24-bucket hour-of-day histogram.

use crate::types::{ChangeKind, EpisodeRecord};
use chrono::{DateTime, Local, Timelike, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Counts {
    by_resource: HashMap<String, u64>,
    by_kind: HashMap<ChangeKind, u64>,
    by_language: HashMap<String, u64>,
    by_hour: [u64; 24],
    total: u64,
    last_updated: Option<DateTime<Utc>>,
}

/// Read-only view of the tracker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_episodes: u64,
    pub top_resources: Vec<(String, u64)>,
    pub top_kinds: Vec<(ChangeKind, u64)>,
    pub top_languages: Vec<(String, u64)>,
    pub hourly: [u64; 24],
    pub last_updated: Option<DateTime<Utc>>,
}

/// Counters derived from flush events
#[derive(Debug, Default)]
pub struct StatisticsTracker {
    counts: RwLock<Counts>,
}

impl StatisticsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Counts> {
        self.counts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Counts> {
        self.counts.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Count one flushed episode, bucketed by the local hour of its timestamp
    pub fn record_flush(&self, record: &EpisodeRecord) {
        let hour = record.timestamp.with_timezone(&Local).hour();
        self.record(&record.resource, record.change_kind, &record.language, hour);
    }

    /// Count one flush with an explicit hour bucket (0-23)
    pub fn record(&self, resource: &str, kind: ChangeKind, language: &str, hour: u32) {
        let mut counts = self.write();
        *counts.by_resource.entry(resource.to_string()).or_default() += 1;
        *counts.by_kind.entry(kind).or_default() += 1;
        *counts.by_language.entry(language.to_string()).or_default() += 1;
        counts.by_hour[(hour % 24) as usize] += 1;
        counts.total += 1;
        counts.last_updated = Some(Utc::now());
    }

    pub fn total_episodes(&self) -> u64 {
        self.read().total
    }

    pub fn top_resources(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.read().by_resource, n)
    }

    pub fn top_kinds(&self, n: usize) -> Vec<(ChangeKind, u64)> {
        top_n(&self.read().by_kind, n)
    }

    pub fn top_languages(&self, n: usize) -> Vec<(String, u64)> {
        top_n(&self.read().by_language, n)
    }

    pub fn hourly(&self) -> [u64; 24] {
        self.read().by_hour
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.read().last_updated
    }

    /// All four views at once, each limited to `n` entries
    pub fn snapshot(&self, n: usize) -> StatisticsSnapshot {
        let counts = self.read();
        StatisticsSnapshot {
            total_episodes: counts.total,
            top_resources: top_n(&counts.by_resource, n),
            top_kinds: top_n(&counts.by_kind, n),
            top_languages: top_n(&counts.by_language, n),
            hourly: counts.by_hour,
            last_updated: counts.last_updated,
        }
    }
}

/// Descending by count, ties broken by key
fn top_n<K: Clone + Ord>(map: &HashMap<K, u64>, n: usize) -> Vec<(K, u64)> {
    let mut entries: Vec<(K, u64)> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}
