//! Sync controller: optimistic board updates with coalesced persistence.
//!
//! Mutations are applied synchronously under a single lock and become
//! visible at once. Persistence runs on a background writer fed by a
//! `watch` channel, so bursts of mutations collapse into one save of the
//! latest board. A monotonically increasing local version tags every board
//! and continues from the revision of the loaded snapshot across sessions;
//! an acknowledgement for a version older than the last persisted one is
//! discarded.

use crate::board::{
    domain::{Board, BoardDomainError, BoardSnapshot, ErrorKind, Mutation, reorder},
    ports::{SnapshotStore, SnapshotStoreError},
};
use crate::config::{BoardConfig, BoardConfigError};
use mockable::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::events::{SyncEvent, SyncStatus};

/// Service-level errors for board synchronization.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The mutation was rejected; the board is unchanged.
    #[error(transparent)]
    Board(#[from] BoardDomainError),

    /// The configuration is inconsistent.
    #[error(transparent)]
    Config(#[from] BoardConfigError),

    /// A save failed or an external snapshot was unreadable.
    #[error("persistence failure: {0}")]
    Persistence(#[from] SnapshotStoreError),

    /// The initial load failed.
    #[error("failed to load board: {0}")]
    LoadFailed(#[source] SnapshotStoreError),

    /// The controller is not in a state that accepts the request.
    #[error("sync controller is {0}")]
    NotReady(SyncStatus),
}

impl SyncError {
    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Board(err) => err.kind(),
            Self::Config(err) => err.kind(),
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
            Self::LoadFailed(_) => ErrorKind::LoadFailed,
            Self::NotReady(_) => ErrorKind::NotReady,
        }
    }
}

/// Result type for sync controller operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug)]
struct SessionState {
    status: SyncStatus,
    board: Arc<Board>,
    version: u64,
    persisted_version: u64,
    last_save_error: Option<SnapshotStoreError>,
}

struct SyncShared<S, C> {
    store: Arc<S>,
    clock: Arc<C>,
    config: BoardConfig,
    state: Mutex<SessionState>,
    save_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<SyncEvent>,
}

/// Owns the session board and keeps the snapshot store in step with it.
///
/// The controller moves through `Loading → Ready → (Mutating → Ready)* →
/// Closed`; a failed initial load ends in `LoadFailed`. Local state is the
/// source of truth for the session: failed saves are reported and retried,
/// never rolled back.
pub struct SyncController<S, C>
where
    S: SnapshotStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    shared: Arc<SyncShared<S, C>>,
    save_requests: Mutex<Option<watch::Sender<u64>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S, C> SyncController<S, C>
where
    S: SnapshotStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a controller in the `Loading` state.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when the configuration is inconsistent.
    pub fn new(store: Arc<S>, clock: Arc<C>, config: BoardConfig) -> SyncResult<Self> {
        config.validate()?;
        let placeholder = Board::new(config.lists.iter().cloned())?;
        let (events, _) = broadcast::channel(config.event_capacity);
        let state = SessionState {
            status: SyncStatus::Loading,
            board: Arc::new(placeholder),
            version: 0,
            persisted_version: 0,
            last_save_error: None,
        };
        Ok(Self {
            shared: Arc::new(SyncShared {
                store,
                clock,
                config,
                state: Mutex::new(state),
                save_lock: tokio::sync::Mutex::new(()),
                events,
            }),
            save_requests: Mutex::new(None),
            writer: Mutex::new(None),
            listener: Mutex::new(None),
        })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.shared.config
    }

    /// Subscribes to controller events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.shared.lock_state().status
    }

    /// Returns the visible board.
    ///
    /// Before a successful load this is an empty board with the configured
    /// lists.
    #[must_use]
    pub fn board(&self) -> Arc<Board> {
        Arc::clone(&self.shared.lock_state().board)
    }

    /// Returns the local version of the visible board.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.lock_state().version
    }

    /// Returns the latest version acknowledged by the store.
    #[must_use]
    pub fn persisted_version(&self) -> u64 {
        self.shared.lock_state().persisted_version
    }

    /// Returns `true` while the visible board is newer than the stored one.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        let state = self.shared.lock_state();
        state.version > state.persisted_version
    }

    /// Returns the most recent save failure, cleared by the next successful
    /// save.
    #[must_use]
    pub fn last_save_error(&self) -> Option<SnapshotStoreError> {
        self.shared.lock_state().last_save_error.clone()
    }

    /// Loads the stored board and starts background persistence.
    ///
    /// A missing snapshot seeds an empty board with the configured lists.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LoadFailed`] when the store fails or holds an
    /// unreadable snapshot; the controller then stays in `LoadFailed`.
    /// Returns [`SyncError::NotReady`] when called outside `Loading`.
    pub async fn start(&self) -> SyncResult<Arc<Board>> {
        let status = self.status();
        if status != SyncStatus::Loading {
            return Err(SyncError::NotReady(status));
        }

        // Subscribe before reading so no external write slips between them.
        let external = self.shared.store.subscribe();
        let loaded = match self.shared.load_board().await {
            Ok(loaded) => loaded,
            Err(err) => {
                error!(error = %err, "failed to load board snapshot");
                self.shared.lock_state().status = SyncStatus::LoadFailed;
                return Err(SyncError::LoadFailed(err));
            }
        };
        let seeded = loaded.is_none();
        let (initial, revision) = match loaded {
            Some(stored) => stored,
            None => (Board::new(self.shared.config.lists.iter().cloned())?, 0),
        };

        // The writer must be listening before the first mutation is accepted.
        let (requests, receiver) = watch::channel(revision);
        *lock(&self.save_requests) = Some(requests);
        *lock(&self.writer) = Some(tokio::spawn(run_writer(
            Arc::clone(&self.shared),
            receiver,
        )));

        let board = {
            let mut state = self.shared.lock_state();
            state.board = Arc::new(initial);
            state.version = revision;
            state.persisted_version = revision;
            state.status = SyncStatus::Ready;
            Arc::clone(&state.board)
        };

        if let Some(changes) = external {
            *lock(&self.listener) = Some(tokio::spawn(run_listener(
                Arc::clone(&self.shared),
                changes,
            )));
        }

        info!(seeded, revision, tasks = board.task_count(), "board loaded");
        self.shared.emit(SyncEvent::Loaded {
            version: revision,
            seeded,
        });
        Ok(board)
    }

    /// Applies a mutation to the visible board and schedules a save.
    ///
    /// The new board is visible as soon as this returns. A mutation that
    /// leaves the board unchanged does not schedule a save.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Board`] when the reorder engine rejects the
    /// mutation, leaving the board unchanged, or [`SyncError::NotReady`]
    /// outside `Ready`/`Mutating`.
    pub fn apply(&self, mutation: Mutation) -> SyncResult<Arc<Board>> {
        self.apply_with(|_| Ok((Some(mutation), ()))).map(|((), board)| board)
    }

    /// Resolves a mutation against the visible board and applies it under
    /// the same lock, so the board cannot change in between.
    ///
    /// `resolve` returns the mutation to apply, or `None` to leave the board
    /// alone, together with a value handed back to the caller.
    pub(super) fn apply_with<T>(
        &self,
        resolve: impl FnOnce(&Board) -> SyncResult<(Option<Mutation>, T)>,
    ) -> SyncResult<(T, Arc<Board>)> {
        let (name, version, resolved, board) = {
            let mut state = self.shared.lock_state();
            if !state.status.accepts_mutations() {
                return Err(SyncError::NotReady(state.status));
            }
            let (mutation, resolved) = resolve(&state.board)?;
            let Some(mutation) = mutation else {
                return Ok((resolved, Arc::clone(&state.board)));
            };
            let name = mutation.name();
            let next = reorder::apply(&state.board, mutation).inspect_err(|err| {
                debug!(mutation = name, error = %err, "mutation rejected");
            })?;
            if next == *state.board {
                return Ok((resolved, Arc::clone(&state.board)));
            }
            state.version += 1;
            state.board = Arc::new(next);
            state.status = SyncStatus::Mutating;
            (name, state.version, resolved, Arc::clone(&state.board))
        };

        debug!(mutation = name, version, "mutation applied");
        self.shared.emit(SyncEvent::BoardChanged { version });
        self.request_save(version);
        Ok((resolved, board))
    }

    /// Reconciles a board written by another session.
    ///
    /// While `Ready` with no save in flight the external board replaces the
    /// local one wholesale and is treated as already persisted. Otherwise the
    /// change is skipped: the pending local save will overwrite it.
    ///
    /// Returns `true` when the external board was applied.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] when the snapshot cannot be
    /// restored against the configured lists.
    pub fn apply_external(&self, snapshot: BoardSnapshot) -> SyncResult<bool> {
        self.shared.reconcile_external(snapshot)
    }

    /// Requeues the latest board after a failed save.
    ///
    /// Returns `false` when there is nothing to save.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotReady`] outside `Ready`/`Mutating`.
    pub fn retry(&self) -> SyncResult<bool> {
        let version = {
            let mut state = self.shared.lock_state();
            if !state.status.accepts_mutations() {
                return Err(SyncError::NotReady(state.status));
            }
            if state.version <= state.persisted_version {
                return Ok(false);
            }
            state.status = SyncStatus::Mutating;
            state.version
        };
        info!(version, "retrying board save");
        self.request_save(version);
        Ok(true)
    }

    /// Saves the latest board now if it has not been persisted yet.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] when the save fails, or
    /// [`SyncError::NotReady`] outside `Ready`/`Mutating`.
    pub async fn flush(&self) -> SyncResult<()> {
        let status = self.status();
        if !status.accepts_mutations() {
            return Err(SyncError::NotReady(status));
        }
        self.shared.persist_latest().await
    }

    /// Stops background work, makes a final save attempt and moves to
    /// `Closed`. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] when the final save fails. The
    /// controller is closed regardless.
    pub async fn close(&self) -> SyncResult<()> {
        let previous = {
            let mut state = self.shared.lock_state();
            let previous = state.status;
            state.status = SyncStatus::Closed;
            previous
        };
        if previous == SyncStatus::Closed {
            return Ok(());
        }

        if let Some(listener) = lock(&self.listener).take() {
            listener.abort();
        }
        let requests = lock(&self.save_requests).take();
        drop(requests);
        let writer = lock(&self.writer).take();
        if let Some(writer) = writer {
            if let Err(err) = writer.await {
                warn!(error = %err, "board writer stopped abnormally");
            }
        }

        let flushed = if previous.accepts_mutations() {
            self.shared.persist_latest().await
        } else {
            Ok(())
        };
        info!(previous = %previous, "sync controller closed");
        self.shared.emit(SyncEvent::Closed);
        flushed
    }

    fn request_save(&self, version: u64) {
        if let Some(requests) = lock(&self.save_requests).as_ref() {
            requests.send_replace(version);
        }
    }
}

impl<S, C> Drop for SyncController<S, C>
where
    S: SnapshotStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(listener) = lock(&self.listener).take() {
            listener.abort();
        }
    }
}

impl<S, C> SyncShared<S, C>
where
    S: SnapshotStore,
    C: Clock + Send + Sync,
{
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    fn emit(&self, event: SyncEvent) {
        // Nobody listening is not an error.
        let _receivers = self.events.send(event);
    }

    /// Loads the stored board together with the revision it was saved at.
    async fn load_board(&self) -> Result<Option<(Board, u64)>, SnapshotStoreError> {
        let Some(snapshot) = self.store.load_snapshot().await? else {
            return Ok(None);
        };
        let revision = snapshot.revision;
        let board = snapshot.restore(&self.config.lists)?;
        Ok(Some((board, revision)))
    }

    async fn persist_latest(&self) -> SyncResult<()> {
        let _serialized = self.save_lock.lock().await;
        let pending = {
            let state = self.lock_state();
            (state.version > state.persisted_version)
                .then(|| (state.version, Arc::clone(&state.board)))
        };
        let Some((version, board)) = pending else {
            return Ok(());
        };

        let snapshot = BoardSnapshot::capture(&board, version, self.clock.utc());
        match self.store.save_snapshot(&snapshot).await {
            Ok(()) => {
                self.acknowledge(version);
                Ok(())
            }
            Err(err) => {
                self.record_failure(version, err.clone());
                Err(SyncError::Persistence(err))
            }
        }
    }

    fn acknowledge(&self, version: u64) {
        {
            let mut state = self.lock_state();
            if version <= state.persisted_version {
                warn!(
                    version,
                    persisted = state.persisted_version,
                    "discarding stale save acknowledgement"
                );
                return;
            }
            state.persisted_version = version;
            state.last_save_error = None;
            if state.version == version && state.status == SyncStatus::Mutating {
                state.status = SyncStatus::Ready;
            }
        }
        debug!(version, "board snapshot saved");
        self.emit(SyncEvent::SaveSucceeded { version });
    }

    fn record_failure(&self, version: u64, err: SnapshotStoreError) {
        {
            let mut state = self.lock_state();
            state.last_save_error = Some(err.clone());
            if state.version == version && state.status == SyncStatus::Mutating {
                state.status = SyncStatus::Ready;
            }
        }
        warn!(version, error = %err, "failed to save board snapshot");
        self.emit(SyncEvent::SaveFailed {
            version,
            error: err,
        });
    }

    fn reconcile_external(&self, snapshot: BoardSnapshot) -> SyncResult<bool> {
        let revision = snapshot.revision;
        let board = match snapshot.restore(&self.config.lists) {
            Ok(board) => board,
            Err(err) => {
                warn!(revision, error = %err, "rejecting external board change");
                self.emit(SyncEvent::ExternalChangeRejected { error: err.clone() });
                return Err(SyncError::Persistence(err.into()));
            }
        };

        let outcome = match self.save_lock.try_lock() {
            Ok(_idle) => {
                let mut state = self.lock_state();
                if state.status == SyncStatus::Ready {
                    // Never step back behind a revision already in the store.
                    state.version = (state.version + 1).max(revision);
                    state.persisted_version = state.version;
                    state.last_save_error = None;
                    state.board = Arc::new(board);
                    Ok(state.version)
                } else {
                    Err(state.status)
                }
            }
            Err(_) => Err(SyncStatus::Mutating),
        };

        match outcome {
            Ok(version) => {
                info!(version, revision, "applied external board change");
                self.emit(SyncEvent::ExternalChangeApplied { version });
                Ok(true)
            }
            Err(status) => {
                debug!(%status, revision, "skipping external board change");
                self.emit(SyncEvent::ExternalChangeSkipped { status });
                Ok(false)
            }
        }
    }
}

async fn run_writer<S, C>(shared: Arc<SyncShared<S, C>>, mut requests: watch::Receiver<u64>)
where
    S: SnapshotStore,
    C: Clock + Send + Sync,
{
    while requests.changed().await.is_ok() {
        let requested = *requests.borrow_and_update();
        if let Err(err) = shared.persist_latest().await {
            debug!(requested, error = %err, "queued save did not complete");
        }
    }
}

async fn run_listener<S, C>(
    shared: Arc<SyncShared<S, C>>,
    mut changes: broadcast::Receiver<BoardSnapshot>,
) where
    S: SnapshotStore,
    C: Clock + Send + Sync,
{
    loop {
        match changes.recv().await {
            Ok(snapshot) => {
                // Rejections are already logged and published as events.
                let _applied = shared.reconcile_external(snapshot);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "missed external board changes");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
