//! Episode record construction

pub mod builder;
pub mod context;

pub use builder::EpisodeBuilder;
pub use context::{context_from_text, extract_context};
