//! Serialized persistence queue
//!
//! Records are pushed onto an unbounded channel and written by a single
//! drain task, one at a time, in enqueue order. Enqueueing never waits on
//! storage. A failed write is logged and counted, and the drain moves on to
//! the next record.

use crate::error::{EpisodicError, Result};
use crate::storage::EpisodeStore;
use crate::types::EpisodeRecord;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Point-in-time queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub enqueued: u64,
    pub written: u64,
    pub failed: u64,
    /// Records refused because the queue was disabled or closed
    pub dropped: u64,
}

impl QueueStats {
    /// Records accepted but not yet written or failed
    pub fn pending(&self) -> u64 {
        self.enqueued.saturating_sub(self.written + self.failed)
    }
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::SeqCst),
            written: self.written.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            dropped: self.dropped.load(Ordering::SeqCst),
        }
    }
}

/// FIFO write queue in front of an [`EpisodeStore`]
pub struct PersistenceQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<EpisodeRecord>>>,
    drain: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
    enabled: bool,
}

impl PersistenceQueue {
    /// Start a queue draining into `store`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(store: Arc<dyn EpisodeStore>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        debug!("Starting persistence queue for {}", store.describe());
        let drain = tokio::spawn(drain_loop(store, receiver, counters.clone()));

        Self {
            sender: Mutex::new(Some(sender)),
            drain: Mutex::new(Some(drain)),
            counters,
            enabled: true,
        }
    }

    /// A queue with no backing store; every record is counted as dropped
    pub fn disabled() -> Self {
        Self {
            sender: Mutex::new(None),
            drain: Mutex::new(None),
            counters: Arc::new(Counters::default()),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Hand a record to the drain task without waiting for the write
    ///
    /// # Errors
    ///
    /// Returns [`EpisodicError::QueueClosed`] after [`shutdown`](Self::shutdown).
    pub fn enqueue(&self, record: EpisodeRecord) -> Result<()> {
        if !self.enabled {
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
            debug!("Persistence disabled, dropping episode {}", record.id);
            return Ok(());
        }

        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = guard.as_ref() else {
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
            return Err(EpisodicError::QueueClosed);
        };

        // Count before sending so the drain task never observes written > enqueued
        self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
        if sender.send(record).is_err() {
            self.counters.enqueued.fetch_sub(1, Ordering::SeqCst);
            self.counters.dropped.fetch_add(1, Ordering::SeqCst);
            return Err(EpisodicError::QueueClosed);
        }
        Ok(())
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    /// Stop accepting records and wait until every accepted record is written
    pub async fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(|e| e.into_inner()).take());

        let drain = self.drain.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = drain {
            if let Err(e) = handle.await {
                warn!("Persistence drain task ended abnormally: {}", e);
            }
        }
    }
}

async fn drain_loop(
    store: Arc<dyn EpisodeStore>,
    mut receiver: mpsc::UnboundedReceiver<EpisodeRecord>,
    counters: Arc<Counters>,
) {
    while let Some(record) = receiver.recv().await {
        match store.write(&record).await {
            Ok(()) => {
                counters.written.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                error!(
                    "Failed to persist episode {} ({}): {}",
                    record.id, record.resource, e
                );
            }
        }
    }
    debug!("Persistence queue drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryEpisodeStore;
    use crate::types::{ChangeKind, EditTotals, EpisodeId, FlushTrigger};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn record(resource: &str) -> EpisodeRecord {
        EpisodeRecord {
            id: EpisodeId::new(),
            resource: resource.to_string(),
            language: "rust".to_string(),
            timestamp: Utc::now(),
            duration_ms: 0,
            change_kind: ChangeKind::Modification,
            patterns: BTreeSet::new(),
            totals: EditTotals::default(),
            change_count: 1,
            first_line: 1,
            last_line: 1,
            importance: 0.3,
            context: None,
            trigger: FlushTrigger::Debounce,
            provenance: "edit_aggregator".to_string(),
            summary: String::new(),
        }
    }

    /// Slow store that tracks how many writes overlap
    #[derive(Default)]
    struct SlowStore {
        in_flight: AtomicU64,
        max_in_flight: AtomicU64,
        order: tokio::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EpisodeStore for SlowStore {
        async fn write(&self, record: &EpisodeRecord) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.order.lock().await.push(record.resource.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        fn describe(&self) -> String {
            "slow".to_string()
        }
    }

    /// Fails every write for resources named "bad"
    struct FlakyStore {
        inner: InMemoryEpisodeStore,
    }

    #[async_trait]
    impl EpisodeStore for FlakyStore {
        async fn write(&self, record: &EpisodeRecord) -> Result<()> {
            if record.resource == "bad" {
                return Err(EpisodicError::Store("disk full".to_string()));
            }
            self.inner.write(record).await
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[tokio::test]
    async fn test_writes_in_enqueue_order_one_at_a_time() {
        let store = Arc::new(SlowStore::default());
        let queue = PersistenceQueue::new(store.clone());

        let names: Vec<String> = (0..20).map(|i| format!("r{i}")).collect();
        for name in &names {
            queue.enqueue(record(name)).unwrap();
        }
        queue.shutdown().await;

        assert_eq!(*store.order.lock().await, names);
        assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);

        let stats = queue.stats();
        assert_eq!(stats.enqueued, 20);
        assert_eq!(stats.written, 20);
        assert_eq!(stats.pending(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_share_one_writer() {
        let store = Arc::new(SlowStore::default());
        let queue = Arc::new(PersistenceQueue::new(store.clone()));

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    for i in 0..25 {
                        queue.enqueue(record(&format!("p{p}-{i}"))).unwrap();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.await.unwrap();
        }
        queue.shutdown().await;

        let order = store.order.lock().await.clone();
        assert_eq!(order.len(), 100);
        let unique: BTreeSet<&String> = order.iter().collect();
        assert_eq!(unique.len(), 100);
        assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);

        for p in 0..4 {
            let prefix = format!("p{p}-");
            let sequence: Vec<u32> = order
                .iter()
                .filter_map(|name| name.strip_prefix(&prefix))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(sequence, (0..25).collect::<Vec<u32>>());
        }

        let stats = queue.stats();
        assert_eq!(stats.enqueued, 100);
        assert_eq!(stats.written, 100);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_stop_drain() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryEpisodeStore::new(),
        });
        let queue = PersistenceQueue::new(store.clone());

        queue.enqueue(record("good-1")).unwrap();
        queue.enqueue(record("bad")).unwrap();
        queue.enqueue(record("good-2")).unwrap();
        queue.shutdown().await;

        let written: Vec<String> = store
            .inner
            .records()
            .await
            .into_iter()
            .map(|r| r.resource)
            .collect();
        assert_eq!(written, vec!["good-1", "good-2"]);

        let stats = queue.stats();
        assert_eq!(stats.written, 2);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_enqueue_after_shutdown_is_refused() {
        let queue = PersistenceQueue::new(Arc::new(InMemoryEpisodeStore::new()));
        queue.shutdown().await;

        let err = queue.enqueue(record("late")).unwrap_err();
        assert!(matches!(err, EpisodicError::QueueClosed));
        assert_eq!(queue.stats().dropped, 1);
        assert_eq!(queue.stats().enqueued, 0);
    }

    #[tokio::test]
    async fn test_disabled_queue_counts_drops() {
        let queue = PersistenceQueue::disabled();
        assert!(!queue.is_enabled());

        queue.enqueue(record("a")).unwrap();
        queue.enqueue(record("b")).unwrap();
        queue.shutdown().await;

        assert_eq!(
            queue.stats(),
            QueueStats {
                dropped: 2,
                ..Default::default()
            }
        );
    }
}
