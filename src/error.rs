//! Error types for the episodic pipeline
//!
//! Capture-side operations never surface these to the editing host; they are
//! returned by configuration loading and store access, and logged everywhere else.

use thiserror::Error;

/// Main error type for episodic operations
#[derive(Error, Debug)]
pub enum EpisodicError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds invalid values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid episode ID format
    #[error("Invalid episode ID: {0}")]
    InvalidEpisodeId(#[from] uuid::Error),

    /// Episode not found in the store
    #[error("Episode not found: {0}")]
    EpisodeNotFound(String),

    /// Store write or read failed
    #[error("Store error: {0}")]
    Store(String),

    /// Persistence queue no longer accepts records
    #[error("Persistence queue is closed")]
    QueueClosed,

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for episodic operations
pub type Result<T> = std::result::Result<T, EpisodicError>;
