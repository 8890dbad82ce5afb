//! Storage layer for episode records
//!
//! The pipeline only needs one capability from a store: append one record as
//! one addressable unit. Writes are serialized by [`PersistenceQueue`], so
//! implementations never see concurrent `write` calls from the pipeline.

pub mod file;
pub mod memory;
pub mod queue;

use crate::error::Result;
use crate::types::EpisodeRecord;
use async_trait::async_trait;

pub use file::FileEpisodeStore;
pub use memory::InMemoryEpisodeStore;
pub use queue::{PersistenceQueue, QueueStats};

/// Append-capable episode store
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Persist one record
    async fn write(&self, record: &EpisodeRecord) -> Result<()>;

    /// Human readable location, used in logs
    fn describe(&self) -> String;
}
