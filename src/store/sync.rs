//! Fire-and-forget background persistence
//!
//! [`spawn`] wraps a store so that `save` only enqueues a snapshot and returns.
//! A worker on tokio's blocking pool writes snapshots to the inner store,
//! keeping only the newest per user. A failed write is logged and kept; it is
//! retried when the next snapshot arrives, or once more at shutdown.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ProgressStore, StoreError};
use crate::progress::ProgressState;

/// A user's state at one point in time
#[derive(Debug)]
struct Snapshot {
    user_id: String,
    state: ProgressState,
}

/// Outcome of a worker's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Successful writes
    pub saved: usize,
    /// Failed write attempts
    pub failures: usize,
    /// Users whose newest snapshot never reached the store
    pub unsynced: usize,
}

/// A [`ProgressStore`] whose saves are queued for the background worker
///
/// Loads and listings go straight to the inner store.
#[derive(Debug)]
pub struct BackgroundStore<S> {
    inner: Arc<S>,
    tx: mpsc::UnboundedSender<Snapshot>,
}

impl<S> Clone for BackgroundStore<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), tx: self.tx.clone() }
    }
}

impl<S> BackgroundStore<S> {
    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ProgressStore> ProgressStore for BackgroundStore<S> {
    fn load(&self, user_id: &str) -> Result<Option<ProgressState>, StoreError> {
        self.inner.load(user_id)
    }

    fn save(&self, user_id: &str, state: &ProgressState) -> Result<(), StoreError> {
        let snapshot = Snapshot { user_id: user_id.to_string(), state: state.clone() };
        self.tx.send(snapshot).map_err(|_| StoreError::SyncClosed)
    }

    fn list_users(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_users()
    }
}

/// Handle to the background worker
#[derive(Debug)]
pub struct SyncWorker {
    task: JoinHandle<SyncReport>,
}

impl SyncWorker {
    /// Wait for the worker to drain and stop
    ///
    /// The worker stops once every [`BackgroundStore`] clone has been dropped.
    pub async fn join(self) -> SyncReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("Sync worker failed: {}", e);
                SyncReport::default()
            }
        }
    }
}

/// Start a background worker writing to `store`
///
/// Must be called from within a tokio runtime.
pub fn spawn<S>(store: S) -> (BackgroundStore<S>, SyncWorker)
where
    S: ProgressStore + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let inner = Arc::new(store);
    let worker_store = Arc::clone(&inner);

    let task = tokio::task::spawn_blocking(move || run(worker_store.as_ref(), rx));

    (BackgroundStore { inner, tx }, SyncWorker { task })
}

fn run<S: ProgressStore>(store: &S, mut rx: mpsc::UnboundedReceiver<Snapshot>) -> SyncReport {
    let mut pending: BTreeMap<String, ProgressState> = BTreeMap::new();
    let mut report = SyncReport::default();

    while let Some(snapshot) = rx.blocking_recv() {
        pending.insert(snapshot.user_id, snapshot.state);

        // Coalesce whatever else is already queued; last write wins
        while let Ok(snapshot) = rx.try_recv() {
            pending.insert(snapshot.user_id, snapshot.state);
        }

        flush(store, &mut pending, &mut report);
    }

    if !pending.is_empty() {
        flush(store, &mut pending, &mut report);
    }

    report.unsynced = pending.len();
    if report.unsynced > 0 {
        tracing::warn!("{} user(s) left unsynced at shutdown", report.unsynced);
    }
    report
}

fn flush<S: ProgressStore>(
    store: &S,
    pending: &mut BTreeMap<String, ProgressState>,
    report: &mut SyncReport,
) {
    pending.retain(|user_id, state| match store.save(user_id, state) {
        Ok(()) => {
            report.saved += 1;
            false
        }
        Err(e) => {
            tracing::warn!("Failed to sync progress for {}: {}", user_id, e);
            report.failures += 1;
            true
        }
    });
}
