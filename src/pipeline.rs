//! Edit-to-episode pipeline
//!
//! Wires the pieces together:
//!
//! ```text
//! host ─▶ exclusion + admission ─▶ AggregationTable
//!                                      │ debounce expiry / save / shutdown
//!                                      ▼
//!                          EpisodeBuilder ─▶ StatisticsTracker
//!                                      │
//!                                      ▼
//!                              PersistenceQueue ─▶ EpisodeStore
//! ```
//!
//! `on_change` and `on_save` are synchronous and never wait on storage.

use crate::capture::{is_meaningful, AggregatedEdit, AggregationTable, FlushHandler, PathExclusions, ResourceFilter};
use crate::config::PipelineConfig;
use crate::episode::EpisodeBuilder;
use crate::stats::StatisticsTracker;
use crate::storage::{EpisodeStore, FileEpisodeStore, PersistenceQueue, QueueStats};
use crate::types::{FlushTrigger, RawChange};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Flush handler: build the record, count it, queue it for persistence
struct EpisodeSink {
    builder: EpisodeBuilder,
    stats: Arc<StatisticsTracker>,
    queue: Arc<PersistenceQueue>,
}

#[async_trait]
impl FlushHandler for EpisodeSink {
    async fn handle_flush(&self, edit: AggregatedEdit, trigger: FlushTrigger) {
        let record = self.builder.build(edit, trigger).await;
        self.stats.record_flush(&record);

        debug!(
            "Episode {} ({}, importance {:.2}, trigger {:?}): {}",
            record.id, record.change_kind, record.importance, trigger, record.summary
        );

        let id = record.id;
        if let Err(e) = self.queue.enqueue(record) {
            warn!("Episode {} not persisted: {}", id, e);
        }
    }
}

/// Captures raw edits and turns them into persisted episode records
pub struct EpisodePipeline {
    config: PipelineConfig,
    filter: Arc<dyn ResourceFilter>,
    table: AggregationTable,
    stats: Arc<StatisticsTracker>,
    queue: Arc<PersistenceQueue>,
}

impl EpisodePipeline {
    /// Create a pipeline persisting into `store`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: PipelineConfig, store: Arc<dyn EpisodeStore>) -> Self {
        Self::with_queue(config, PersistenceQueue::new(store))
    }

    /// Create a pipeline backed by a [`FileEpisodeStore`] at `config.store_dir`
    ///
    /// If the store cannot be opened, or no directory is configured, capture
    /// still runs and records are counted as dropped.
    pub async fn from_config(config: PipelineConfig) -> Self {
        let queue = match &config.store_dir {
            Some(dir) => match FileEpisodeStore::open(dir).await {
                Ok(store) => {
                    info!("Persisting episodes to {}", dir.display());
                    PersistenceQueue::new(Arc::new(store))
                }
                Err(e) => {
                    warn!("Episode store unavailable, persistence disabled: {}", e);
                    PersistenceQueue::disabled()
                }
            },
            None => {
                info!("No store directory configured, persistence disabled");
                PersistenceQueue::disabled()
            }
        };

        Self::with_queue(config, queue)
    }

    fn with_queue(config: PipelineConfig, queue: PersistenceQueue) -> Self {
        let stats = Arc::new(StatisticsTracker::new());
        let queue = Arc::new(queue);
        let sink = Arc::new(EpisodeSink {
            builder: EpisodeBuilder::from_config(&config),
            stats: stats.clone(),
            queue: queue.clone(),
        });

        let filter = Arc::new(PathExclusions::new(
            &config.exclude_patterns,
            config.store_dir.as_deref(),
        ));
        let table = AggregationTable::new(config.debounce, config.min_changes, sink);

        Self {
            config,
            filter,
            table,
            stats,
            queue,
        }
    }

    /// Replace the default path exclusion filter
    pub fn with_filter(mut self, filter: Arc<dyn ResourceFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Host notification: a resource changed
    ///
    /// Returns `true` if the change was admitted into the aggregation table.
    pub fn on_change(&self, resource: &str, language: &str, change: RawChange) -> bool {
        if !self.config.enabled {
            return false;
        }
        if self.filter.is_excluded(resource) {
            trace!("Ignoring change to excluded resource {}", resource);
            return false;
        }
        if !is_meaningful(&change) {
            trace!("Ignoring trivial change to {}", resource);
            return false;
        }

        self.table.accumulate(resource, language, change);
        true
    }

    /// Host notification: a resource was saved
    ///
    /// Ends the resource's episode immediately; building and persisting the
    /// record happen in the background. Returns `true` if an episode was open.
    pub fn on_save(&self, resource: &str) -> bool {
        self.table.flush_in_background(resource, FlushTrigger::Save)
    }

    /// Flush one resource and wait until its record is queued
    ///
    /// Returns `true` if a record was produced.
    pub async fn flush(&self, resource: &str) -> bool {
        self.table.flush(resource, FlushTrigger::Save).await
    }

    /// Flush every hot resource; returns the number of records produced
    pub async fn flush_all(&self) -> usize {
        self.table.flush_all(FlushTrigger::Shutdown).await
    }

    /// Resources with an in-progress aggregate
    pub fn hot_resources(&self) -> Vec<String> {
        self.table.hot_resources()
    }

    /// Shared handle to the statistics tracker; stays valid after shutdown
    pub fn statistics(&self) -> Arc<StatisticsTracker> {
        Arc::clone(&self.stats)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Flush everything, wait for in-flight flushes, and drain the queue
    pub async fn shutdown(self) -> QueueStats {
        let flushed = self.table.flush_all(FlushTrigger::Shutdown).await;
        self.table.wait_idle().await;
        self.queue.shutdown().await;

        let stats = self.queue.stats();
        info!(
            "Pipeline stopped: {} flushed at shutdown, {} written, {} failed, {} dropped",
            flushed, stats.written, stats.failed, stats.dropped
        );
        stats
    }
}
