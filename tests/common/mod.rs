//! Common test utilities and helpers

#![allow(dead_code)]

use episodic_core::{EpisodePipeline, EpisodeRecord, InMemoryEpisodeStore, PipelineConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Debounce window used by timing-sensitive tests
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(100);

/// Config with a short debounce, no context reads, and no store directory
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        debounce: TEST_DEBOUNCE,
        context_lines: 0,
        store_dir: None,
        ..Default::default()
    }
}

/// Create a pipeline writing into a fresh in-memory store
pub fn create_test_pipeline(config: PipelineConfig) -> (EpisodePipeline, Arc<InMemoryEpisodeStore>) {
    let store = Arc::new(InMemoryEpisodeStore::new());
    let pipeline = EpisodePipeline::new(config, store.clone());
    (pipeline, store)
}

/// Poll the store until it holds `count` records or `timeout` elapses
pub async fn wait_for_records(
    store: &InMemoryEpisodeStore,
    count: usize,
    timeout: Duration,
) -> Vec<EpisodeRecord> {
    let deadline = Instant::now() + timeout;
    loop {
        let records = store.records().await;
        if records.len() >= count || Instant::now() >= deadline {
            return records;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
