//! In-memory snapshot store for tests and embedding.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

use crate::board::{
    domain::BoardSnapshot,
    ports::{SnapshotStore, SnapshotStoreError, SnapshotStoreResult},
};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Thread-safe in-memory snapshot store with change notification.
///
/// Saves from the owning session are not echoed to subscribers. Writes from
/// another session are simulated with [`publish_external`](Self::publish_external).
#[derive(Debug, Clone)]
pub struct InMemorySnapshotStore {
    state: Arc<RwLock<InMemorySnapshotState>>,
    changes: broadcast::Sender<BoardSnapshot>,
    fail_loads: Arc<AtomicBool>,
    fail_saves: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct InMemorySnapshotState {
    current: Option<BoardSnapshot>,
    saved_revisions: Vec<u64>,
}

impl InMemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(InMemorySnapshotState::default())),
            changes,
            fail_loads: Arc::new(AtomicBool::new(false)),
            fail_saves: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a store that already holds `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: BoardSnapshot) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            state.current = Some(snapshot);
        }
        store
    }

    /// Returns the currently stored snapshot.
    #[must_use]
    pub fn current(&self) -> Option<BoardSnapshot> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.current.clone())
    }

    /// Returns the revisions of every acknowledged save, oldest first.
    #[must_use]
    pub fn saved_revisions(&self) -> Vec<u64> {
        self.state
            .read()
            .map(|state| state.saved_revisions.clone())
            .unwrap_or_default()
    }

    /// Returns the number of acknowledged saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.state
            .read()
            .map(|state| state.saved_revisions.len())
            .unwrap_or(0)
    }

    /// Makes subsequent loads fail with [`SnapshotStoreError::Unavailable`].
    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent saves fail with [`SnapshotStoreError::Unavailable`].
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Stores `snapshot` as if another session had written it and notifies
    /// subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::Persistence`] if the store lock is
    /// poisoned.
    pub fn publish_external(&self, snapshot: BoardSnapshot) -> SnapshotStoreResult<()> {
        {
            let mut state = self.state.write().map_err(poisoned)?;
            state.current = Some(snapshot.clone());
        }
        // No subscribers is fine: the stored value is the source of truth.
        let _receivers = self.changes.send(snapshot);
        Ok(())
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> SnapshotStoreError {
    SnapshotStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load_snapshot(&self) -> SnapshotStoreResult<Option<BoardSnapshot>> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(SnapshotStoreError::Unavailable(
                "load rejected by in-memory store".to_owned(),
            ));
        }
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.current.clone())
    }

    async fn save_snapshot(&self, snapshot: &BoardSnapshot) -> SnapshotStoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SnapshotStoreError::Unavailable(
                "save rejected by in-memory store".to_owned(),
            ));
        }
        let mut state = self.state.write().map_err(poisoned)?;
        state.current = Some(snapshot.clone());
        state.saved_revisions.push(snapshot.revision);
        Ok(())
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<BoardSnapshot>> {
        Some(self.changes.subscribe())
    }
}
