//! Persistence port for board snapshots.

use crate::board::domain::{BoardSnapshot, ErrorKind, SnapshotError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Result type for snapshot store operations.
pub type SnapshotStoreResult<T> = Result<T, SnapshotStoreError>;

/// Whole-board snapshot persistence contract.
///
/// Implementations overwrite the stored document on every save. The board is
/// small and bounded, so there is no patch protocol.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Reads the last durably stored snapshot.
    ///
    /// Returns `None` when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError`] when the store cannot be read or the
    /// stored document is unreadable.
    async fn load_snapshot(&self) -> SnapshotStoreResult<Option<BoardSnapshot>>;

    /// Durably replaces the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError`] when the write is not acknowledged.
    async fn save_snapshot(&self, snapshot: &BoardSnapshot) -> SnapshotStoreResult<()>;

    /// Subscribes to snapshots written by sources other than this session.
    ///
    /// Stores without change notification return `None`.
    fn subscribe(&self) -> Option<broadcast::Receiver<BoardSnapshot>> {
        None
    }
}

/// Errors returned by snapshot store implementations.
#[derive(Debug, Clone, Error)]
pub enum SnapshotStoreError {
    /// The stored document could not be decoded.
    #[error("stored snapshot is unreadable: {0}")]
    Malformed(#[from] SnapshotError),

    /// The store refused or dropped the request.
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SnapshotStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) => ErrorKind::LoadFailed,
            Self::Unavailable(_) | Self::Persistence(_) => ErrorKind::PersistenceFailure,
        }
    }
}
