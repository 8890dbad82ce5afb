//! Host event wire form
//!
//! Editors (or recorded sessions) describe edits as JSON Lines:
//!
//! ```text
//! {"type":"change","resource":"src/a.rs","language":"rust","offset":0,"line":1,"text":"fn a() {}"}
//! {"type":"change","resource":"src/a.rs","language":"rust","offset":4,"line":1,"removed_len":1,"delay_ms":250}
//! {"type":"save","resource":"src/a.rs"}
//! ```
//!
//! `delay_ms` is the pause before the event is applied, which lets a replay
//! reproduce the original typing rhythm against the debounce window.

use crate::error::Result;
use crate::pipeline::EpisodePipeline;
use crate::types::RawChange;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, trace, warn};

/// One host notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Change {
        resource: String,
        #[serde(default = "default_language")]
        language: String,
        #[serde(flatten)]
        change: RawChange,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay_ms: Option<u64>,
    },
    Save {
        resource: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        delay_ms: Option<u64>,
    },
}

fn default_language() -> String {
    "plaintext".to_string()
}

impl HostEvent {
    /// Parse one line; blank lines and `#` comments yield `None`
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(trimmed)?))
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            HostEvent::Change { delay_ms, .. } | HostEvent::Save { delay_ms, .. } => {
                delay_ms.map(Duration::from_millis)
            }
        }
    }

    pub fn resource(&self) -> &str {
        match self {
            HostEvent::Change { resource, .. } | HostEvent::Save { resource, .. } => resource,
        }
    }

    /// Deliver this event to the pipeline
    ///
    /// Returns `true` for an admitted change or any save.
    pub fn apply(self, pipeline: &EpisodePipeline) -> bool {
        match self {
            HostEvent::Change {
                resource,
                language,
                change,
                ..
            } => pipeline.on_change(&resource, &language, change),
            HostEvent::Save { resource, .. } => {
                pipeline.on_save(&resource);
                true
            }
        }
    }
}

/// Counts from one replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub admitted: usize,
    pub saves: usize,
    pub malformed: usize,
}

/// Feed a JSON Lines event stream into the pipeline, honoring `delay_ms`
///
/// Malformed lines are logged and skipped.
pub async fn replay<R>(pipeline: &EpisodePipeline, reader: R) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let event = match HostEvent::parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping malformed event on line {}: {}", line_no, e);
                summary.malformed += 1;
                continue;
            }
        };

        if let Some(delay) = event.delay() {
            tokio::time::sleep(delay).await;
        }

        summary.events += 1;
        trace!("Line {}: event for {}", line_no, event.resource());
        let is_save = matches!(event, HostEvent::Save { .. });
        if event.apply(pipeline) {
            if is_save {
                summary.saves += 1;
            } else {
                summary.admitted += 1;
            }
        }
    }

    debug!("Replay finished: {:?}", summary);
    Ok(summary)
}
