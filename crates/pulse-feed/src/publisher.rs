//! Snapshot publisher.
//!
//! Owns the ingestion state: the latest record for every symbol in the feed
//! and the history of tracked symbols. Each accepted frame is applied under
//! one lock, producing one snapshot in tracked order. Observers are notified
//! after the lock is released, then the snapshot is broadcast to async
//! subscribers.

use crate::error::FeedResult;
use crate::history::{HistoryStore, HistoryTrend};
use crate::normalizer::Normalizer;
use parking_lot::{Mutex, RwLock};
use pulse_core::{now_ms, PriceRecord, Snapshot, TrackedSymbols};
use pulse_ws::{ConnectionState, FrameHandler, RawTick};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Broadcast channel depth.
const BROADCAST_CAPACITY: usize = 64;

/// Synchronous snapshot consumer. Called on the ingestion task; must not
/// block and must not disconnect the feed from inside the callback.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: &Snapshot);

    /// Connection status changed.
    fn on_state_change(&self, _state: ConnectionState) {}
}

#[derive(Debug)]
struct IngestState {
    latest: HashMap<String, PriceRecord>,
    history: HistoryStore,
    sequence: u64,
}

/// Applies frames and publishes snapshots.
pub struct SnapshotPublisher {
    tracked: TrackedSymbols,
    normalizer: Normalizer,
    state: Mutex<IngestState>,
    observers: RwLock<Vec<Arc<dyn SnapshotObserver>>>,
    tx: broadcast::Sender<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    pub fn new(tracked: TrackedSymbols, normalizer: Normalizer, history_capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tracked,
            normalizer,
            state: Mutex::new(IngestState {
                latest: HashMap::new(),
                history: HistoryStore::new(
                    history_capacity,
                    normalizer.precision().percent_dp,
                ),
                sequence: 0,
            }),
            observers: RwLock::new(Vec::new()),
            tx,
        }
    }

    pub fn tracked(&self) -> &TrackedSymbols {
        &self.tracked
    }

    /// Apply one accepted frame and publish the resulting snapshot.
    ///
    /// An empty frame still produces a snapshot.
    pub fn publish(&self, ticks: &[RawTick]) -> Arc<Snapshot> {
        let snapshot = {
            let mut state = self.state.lock();
            let now = now_ms();

            for tick in ticks {
                let Some(symbol) = tick.symbol() else {
                    debug!("Skipping tick without symbol");
                    continue;
                };
                let record = self.normalizer.normalize_at(tick, now);
                if self.tracked.is_tracked(symbol) {
                    state.history.append(record.clone());
                }
                state.latest.insert(symbol.to_string(), record);
            }

            state.sequence += 1;
            Arc::new(self.build_snapshot(&state, now))
        };

        trace!(
            sequence = snapshot.sequence,
            ticks = ticks.len(),
            "Snapshot built"
        );
        self.notify(&snapshot);
        snapshot
    }

    fn build_snapshot(&self, state: &IngestState, now: i64) -> Snapshot {
        let precision = self.normalizer.precision();
        let records = self
            .tracked
            .iter()
            .map(|symbol| {
                state
                    .latest
                    .get(symbol)
                    .cloned()
                    .unwrap_or_else(|| PriceRecord::placeholder(symbol, precision, now))
            })
            .collect();

        Snapshot {
            sequence: state.sequence,
            emitted_at: now,
            records,
        }
    }

    fn notify(&self, snapshot: &Arc<Snapshot>) {
        for observer in self.observers() {
            observer.on_snapshot(snapshot);
        }
        // No receivers is fine.
        let _ = self.tx.send(Arc::clone(snapshot));
    }

    fn observers(&self) -> Vec<Arc<dyn SnapshotObserver>> {
        self.observers.read().clone()
    }

    /// Register `observer`. Returns `false` if it is already registered.
    pub fn add_observer(&self, observer: Arc<dyn SnapshotObserver>) -> bool {
        let mut observers = self.observers.write();
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    pub fn clear_observers(&self) {
        self.observers.write().clear();
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Receiver for every snapshot published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Latest record for any symbol seen in the feed, tracked or not.
    pub fn latest(&self, symbol: &str) -> Option<PriceRecord> {
        self.state.lock().latest.get(symbol).cloned()
    }

    pub fn history(&self, symbol: &str) -> Vec<PriceRecord> {
        self.state.lock().history.get(symbol)
    }

    pub fn recent(&self, symbol: &str, n: usize) -> Vec<PriceRecord> {
        self.state.lock().history.recent(symbol, n)
    }

    pub fn trend(&self, symbol: &str) -> Option<HistoryTrend> {
        self.state.lock().history.trend(symbol)
    }

    /// Current view, built on demand. Carries the sequence of the last
    /// published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.lock();
        self.build_snapshot(&state, now_ms())
    }

    /// Current view as JSON.
    pub fn snapshot_json(&self) -> FeedResult<String> {
        Ok(serde_json::to_string(&self.snapshot())?)
    }

    /// Frames applied so far.
    pub fn sequence(&self) -> u64 {
        self.state.lock().sequence
    }

    /// Tracked symbols that have received at least one record.
    pub fn tracked_with_data(&self) -> usize {
        let state = self.state.lock();
        self.tracked
            .iter()
            .filter(|s| state.latest.contains_key(*s))
            .count()
    }

    /// Symbols in the latest map, tracked or not.
    pub fn known_symbols(&self) -> usize {
        self.state.lock().latest.len()
    }
}

impl FrameHandler for SnapshotPublisher {
    fn on_frame(&self, ticks: Vec<RawTick>) {
        self.publish(&ticks);
    }

    fn on_state_change(&self, state: ConnectionState) {
        for observer in self.observers() {
            observer.on_state_change(state);
        }
    }
}
