//! Shared test helpers for in-memory sync controller integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use eyre::{WrapErr, eyre};
use mockable::DefaultClock;
use rstest::fixture;
use taskboard::{
    board::{
        adapters::memory::InMemorySnapshotStore,
        domain::{Board, BoardSnapshot, ListId, NewTask, TaskId, reorder},
        ports::{SnapshotStore, SnapshotStoreResult},
        services::{SyncController, SyncEvent},
    },
    config::BoardConfig,
};
use tokio::sync::{Mutex, Notify, OwnedMutexGuard, broadcast};

/// Controller over the plain in-memory store.
pub type MemoryController = SyncController<InMemorySnapshotStore, DefaultClock>;

/// Controller over a store whose writes can be held open.
pub type GatedController = SyncController<GatedStore, DefaultClock>;

/// Provides a fresh in-memory store for each test.
#[fixture]
pub fn store() -> Arc<InMemorySnapshotStore> {
    Arc::new(InMemorySnapshotStore::new())
}

/// Parses a list identifier.
///
/// # Panics
///
/// Panics when `id` is not a valid list identifier.
#[must_use]
pub fn list(id: &str) -> ListId {
    ListId::new(id).expect("valid list id")
}

/// Parses a task identifier.
///
/// # Panics
///
/// Panics when `id` is blank.
#[must_use]
pub fn task_id(id: &str) -> TaskId {
    TaskId::parse(id).expect("valid task id")
}

/// Builds a board with the default lists holding the given task ids.
///
/// # Errors
///
/// Returns an error if any insertion is rejected.
pub fn board_with(entries: &[(&str, &[&str])]) -> eyre::Result<Board> {
    let config = BoardConfig::default();
    let mut board = Board::new(config.lists).wrap_err("default lists")?;
    for (list_id, ids) in entries {
        for id in *ids {
            let task = NewTask::new(task_id(id), format!("task {id}"))?;
            board = reorder::insert(&board, &list(list_id), task)
                .wrap_err_with(|| format!("insert {id} into {list_id}"))?;
        }
    }
    Ok(board)
}

/// Returns the task ids of one list, in order.
#[must_use]
pub fn ids_in(board: &Board, list_id: &str) -> Vec<String> {
    board
        .tasks_in(&list(list_id))
        .map(|tasks| tasks.iter().map(|task| task.id().to_string()).collect())
        .unwrap_or_default()
}

/// Restores the board currently held by `store` against the default lists.
///
/// # Errors
///
/// Returns an error when the store is empty or the snapshot is unreadable.
pub fn stored_board(store: &InMemorySnapshotStore) -> eyre::Result<Board> {
    let snapshot = store.current().ok_or_else(|| eyre!("store is empty"))?;
    Ok(snapshot.restore(&BoardConfig::default().lists)?)
}

/// Waits for the first event accepted by `wanted`.
///
/// # Errors
///
/// Returns an error if the stream closes or no matching event arrives within
/// five seconds.
pub async fn wait_for(
    events: &mut broadcast::Receiver<SyncEvent>,
    mut wanted: impl FnMut(&SyncEvent) -> bool,
) -> eyre::Result<SyncEvent> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await?;
            if wanted(&event) {
                return Ok::<_, eyre::Report>(event);
            }
        }
    })
    .await
    .wrap_err("timed out waiting for sync event")?
}

/// In-memory store whose saves block while the gate is held.
#[derive(Debug, Clone)]
pub struct GatedStore {
    inner: InMemorySnapshotStore,
    gate: Arc<Mutex<()>>,
    save_started: Arc<Notify>,
}

impl GatedStore {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: InMemorySnapshotStore) -> Self {
        Self {
            inner,
            gate: Arc::new(Mutex::new(())),
            save_started: Arc::new(Notify::new()),
        }
    }

    /// Returns the wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &InMemorySnapshotStore {
        &self.inner
    }

    /// Holds every save until the returned guard is dropped.
    pub async fn close_gate(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.gate).lock_owned().await
    }

    /// Waits until a save has reached the gate.
    pub async fn wait_for_save_start(&self) {
        self.save_started.notified().await;
    }
}

#[async_trait]
impl SnapshotStore for GatedStore {
    async fn load_snapshot(&self) -> SnapshotStoreResult<Option<BoardSnapshot>> {
        self.inner.load_snapshot().await
    }

    async fn save_snapshot(&self, snapshot: &BoardSnapshot) -> SnapshotStoreResult<()> {
        self.save_started.notify_one();
        let _open = self.gate.lock().await;
        self.inner.save_snapshot(snapshot).await
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<BoardSnapshot>> {
        self.inner.subscribe()
    }
}
