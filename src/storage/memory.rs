//! In-memory episode store, for tests and dry runs

use crate::error::Result;
use crate::storage::EpisodeStore;
use crate::types::EpisodeRecord;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Keeps every written record in arrival order
#[derive(Debug, Default)]
pub struct InMemoryEpisodeStore {
    records: Mutex<Vec<EpisodeRecord>>,
}

impl InMemoryEpisodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored records, in write order
    pub async fn records(&self) -> Vec<EpisodeRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl EpisodeStore for InMemoryEpisodeStore {
    async fn write(&self, record: &EpisodeRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
