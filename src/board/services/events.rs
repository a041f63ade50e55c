//! Controller status and the events it publishes.

use crate::board::{domain::SnapshotError, ports::SnapshotStoreError};
use std::fmt;

/// Lifecycle state of a [`SyncController`](super::SyncController).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    /// Waiting for the initial snapshot.
    Loading,
    /// Board loaded and every local change acknowledged or reported.
    Ready,
    /// A save for the latest local change is pending.
    Mutating,
    /// The initial load failed; the session cannot proceed.
    LoadFailed,
    /// The controller has been shut down.
    Closed,
}

impl SyncStatus {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Mutating => "mutating",
            Self::LoadFailed => "load_failed",
            Self::Closed => "closed",
        }
    }

    /// Returns `true` when the controller accepts mutations.
    #[must_use]
    pub const fn accepts_mutations(self) -> bool {
        matches!(self, Self::Ready | Self::Mutating)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications published by the controller for the host to surface.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The initial board is in place.
    Loaded {
        /// Local version of the loaded board, continuing from the stored
        /// revision.
        version: u64,
        /// `true` when no snapshot existed and a default board was seeded.
        seeded: bool,
    },
    /// A local mutation replaced the visible board.
    BoardChanged {
        /// Local version of the new board.
        version: u64,
    },
    /// The store acknowledged a save.
    SaveSucceeded {
        /// Version that is now durable.
        version: u64,
    },
    /// A save failed; the board was not rolled back.
    SaveFailed {
        /// Version that failed to persist.
        version: u64,
        /// Failure reported by the store.
        error: SnapshotStoreError,
    },
    /// A board written by another session replaced the local board.
    ExternalChangeApplied {
        /// Local version assigned to the external board.
        version: u64,
    },
    /// A board written by another session arrived while a local save was
    /// pending and was ignored.
    ExternalChangeSkipped {
        /// Status at the time of arrival.
        status: SyncStatus,
    },
    /// A board written by another session could not be restored.
    ExternalChangeRejected {
        /// Restore failure.
        error: SnapshotError,
    },
    /// The controller shut down.
    Closed,
}
