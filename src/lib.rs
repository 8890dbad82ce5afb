//! Episodic - Edit Aggregation and Episodic Memory Pipeline
//!
//! Turns a high-frequency stream of fine-grained edit events into a
//! low-frequency stream of semantically summarized episode records:
//! - Per-resource debounced aggregation of raw edits
//! - Shallow lexical classification and pattern tagging
//! - Heuristic importance scoring
//! - Serialized, non-blocking persistence
//! - Activity statistics over flushed episodes
//!
//! # Architecture
//!
//! - **Capture**: admission filter, exclusion policy, aggregation table
//! - **Analysis**: change classifier, pattern detector, importance scorer
//! - **Episode**: record construction and context extraction
//! - **Storage**: store trait, file/in-memory stores, persistence queue
//! - **Pipeline**: the facade hosts talk to
//!
//! # Example
//!
//! ```ignore
//! use episodic_core::{EpisodePipeline, PipelineConfig, RawChange};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::load(None)?;
//!     let pipeline = EpisodePipeline::from_config(config).await;
//!
//!     pipeline.on_change("src/lib.rs", "rust", RawChange::insert(0, 1, "fn parse() {}"));
//!     pipeline.on_save("src/lib.rs");
//!
//!     pipeline.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod capture;
pub mod config;
pub mod episode;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod stats;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{EpisodicError, Result};
pub use host::{HostEvent, ReplaySummary};
pub use pipeline::EpisodePipeline;
pub use stats::{StatisticsSnapshot, StatisticsTracker};
pub use storage::{EpisodeStore, FileEpisodeStore, InMemoryEpisodeStore, QueueStats};
pub use types::{
    ChangeKind, EditTotals, EpisodeContext, EpisodeId, EpisodeRecord, FlushTrigger, RawChange,
};
