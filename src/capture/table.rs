//! Aggregation table with per-resource debounce timers
//!
//! Holds one [`AggregatedEdit`] per "hot" resource. Every accumulate call
//! cancels the resource's pending timer and starts a fresh one, so a resource
//! only flushes after a full quiet window.
//!
//! # Locking
//!
//! Table state is guarded by a mutex scoped to map access only. A flush
//! removes its entry while holding the lock and does everything else
//! (classification, context reads, enqueueing) after releasing it, so a
//! concurrent accumulate for the same resource starts a fresh aggregate.
//! Each scheduled timer carries a generation number; a timer that wakes up
//! after its entry was replaced or flushed does nothing.
//!
//! # Ordering
//!
//! Removing an entry also reserves its place in the resource's flush order:
//! the flush waits for the previous flush of the same resource to finish
//! before handing its aggregate on, so records for one resource leave the
//! table in the order their entries were removed.

use crate::capture::aggregate::AggregatedEdit;
use crate::types::{FlushTrigger, RawChange};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

/// Receives aggregates that were removed from the table and passed the
/// minimum-change threshold
#[async_trait]
pub trait FlushHandler: Send + Sync {
    async fn handle_flush(&self, edit: AggregatedEdit, trigger: FlushTrigger);
}

struct HotEntry {
    edit: AggregatedEdit,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl HotEntry {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// A removed entry's place in its resource's flush order
struct FlushTicket {
    resource: String,
    generation: u64,
    after: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
}

#[derive(Default)]
struct TableState {
    hot: HashMap<String, HotEntry>,
    /// Completion signal of the most recent flush per resource
    flushing: HashMap<String, (u64, oneshot::Receiver<()>)>,
}

impl TableState {
    /// Remove a hot entry and queue it behind any flush of the same resource
    fn take(&mut self, resource: &str) -> Option<(HotEntry, FlushTicket)> {
        let mut entry = self.hot.remove(resource)?;
        entry.cancel_timer();

        let (done, signal) = oneshot::channel();
        let after = self
            .flushing
            .insert(resource.to_string(), (entry.generation, signal))
            .map(|(_, previous)| previous);

        let ticket = FlushTicket {
            resource: resource.to_string(),
            generation: entry.generation,
            after,
            done,
        };
        Some((entry, ticket))
    }
}

struct TableInner {
    state: Mutex<TableState>,
    next_generation: AtomicU64,
    debounce: Duration,
    min_changes: usize,
    handler: Arc<dyn FlushHandler>,
    tracker: TaskTracker,
}

impl TableInner {
    fn state(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Timer callback: flush only if the entry still belongs to this timer
    async fn expire(&self, resource: &str, generation: u64) {
        let taken = {
            let mut state = self.state();
            let current = state
                .hot
                .get(resource)
                .is_some_and(|entry| entry.generation == generation);
            if current {
                // Drop the handle first; it belongs to this very task
                if let Some(entry) = state.hot.get_mut(resource) {
                    entry.timer = None;
                }
                state.take(resource)
            } else {
                None
            }
        };

        if let Some((entry, ticket)) = taken {
            debug!("Debounce window expired for {}", resource);
            self.finish(entry.edit, FlushTrigger::Debounce, ticket).await;
        } else {
            trace!("Stale timer for {} ignored", resource);
        }
    }

    async fn finish(&self, edit: AggregatedEdit, trigger: FlushTrigger, ticket: FlushTicket) -> bool {
        if let Some(previous) = ticket.after {
            // Err only means the previous flush task is gone
            let _ = previous.await;
        }

        let emitted = if edit.change_count() < self.min_changes {
            debug!(
                "Discarding aggregate for {} ({} < {} changes)",
                edit.resource,
                edit.change_count(),
                self.min_changes
            );
            false
        } else {
            self.handler.handle_flush(edit, trigger).await;
            true
        };

        {
            let mut state = self.state();
            let latest = state
                .flushing
                .get(&ticket.resource)
                .is_some_and(|(generation, _)| *generation == ticket.generation);
            if latest {
                state.flushing.remove(&ticket.resource);
            }
        }
        let _ = ticket.done.send(());

        emitted
    }
}

/// Mapping from resource identifier to in-progress aggregate
#[derive(Clone)]
pub struct AggregationTable {
    inner: Arc<TableInner>,
}

impl AggregationTable {
    /// Create a table that hands flushed aggregates to `handler`
    pub fn new(debounce: Duration, min_changes: usize, handler: Arc<dyn FlushHandler>) -> Self {
        Self {
            inner: Arc::new(TableInner {
                state: Mutex::new(TableState::default()),
                next_generation: AtomicU64::new(1),
                debounce,
                min_changes: min_changes.max(1),
                handler,
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Add a change to the resource's aggregate and restart its debounce timer
    ///
    /// Must be called from within a tokio runtime.
    pub fn accumulate(&self, resource: &str, language: &str, change: RawChange) {
        let now = Utc::now();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        let mut state = self.inner.state();
        match state.hot.get_mut(resource) {
            Some(entry) => {
                entry.cancel_timer();
                entry.edit.push(change, now);
                entry.generation = generation;
                entry.timer = Some(self.schedule(resource, generation));
                trace!(
                    "Accumulated change #{} for {}",
                    entry.edit.change_count(),
                    resource
                );
            }
            None => {
                let edit = AggregatedEdit::new(resource, language, change, now);
                let timer = self.schedule(resource, generation);
                state.hot.insert(
                    resource.to_string(),
                    HotEntry {
                        edit,
                        generation,
                        timer: Some(timer),
                    },
                );
                debug!("Started aggregate for {}", resource);
            }
        }
    }

    fn schedule(&self, resource: &str, generation: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let resource = resource.to_string();
        self.inner.tracker.spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.expire(&resource, generation).await;
        })
    }

    /// Flush one resource now, independent of its timer
    ///
    /// Returns `true` if an aggregate was handed to the flush handler.
    pub async fn flush(&self, resource: &str, trigger: FlushTrigger) -> bool {
        let taken = self.inner.state().take(resource);

        match taken {
            Some((entry, ticket)) => self.inner.finish(entry.edit, trigger, ticket).await,
            None => false,
        }
    }

    /// Close the resource's aggregate now and flush it on a tracked task
    ///
    /// The entry leaves the table before this returns, so a change arriving
    /// afterwards starts a new aggregate. Returns `true` if there was one.
    pub fn flush_in_background(&self, resource: &str, trigger: FlushTrigger) -> bool {
        let Some((entry, ticket)) = self.inner.state().take(resource) else {
            return false;
        };

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(async move {
            inner.finish(entry.edit, trigger, ticket).await;
        });
        true
    }

    /// Flush every hot resource and cancel all outstanding timers
    ///
    /// Returns the number of aggregates handed to the flush handler.
    pub async fn flush_all(&self, trigger: FlushTrigger) -> usize {
        let drained: Vec<(HotEntry, FlushTicket)> = {
            let mut state = self.inner.state();
            let resources: Vec<String> = state.hot.keys().cloned().collect();
            resources
                .iter()
                .filter_map(|resource| state.take(resource))
                .collect()
        };

        let mut flushed = 0;
        for (entry, ticket) in drained {
            if self.inner.finish(entry.edit, trigger, ticket).await {
                flushed += 1;
            }
        }
        flushed
    }

    /// Wait for every timer and background flush task to finish
    ///
    /// Call after [`flush_all`](Self::flush_all); timers it cancelled finish
    /// immediately, flushes already past their lock complete normally.
    pub async fn wait_idle(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        self.inner.tracker.reopen();
    }

    /// Resources with an in-progress aggregate, sorted
    pub fn hot_resources(&self) -> Vec<String> {
        let mut resources: Vec<String> = self.inner.state().hot.keys().cloned().collect();
        resources.sort();
        resources
    }

    /// Number of retained changes for a hot resource
    pub fn pending_changes(&self, resource: &str) -> Option<usize> {
        self.inner
            .state()
            .hot
            .get(resource)
            .map(|entry| entry.edit.change_count())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state().hot.is_empty()
    }
}
