//! Error types for board construction and reorder transitions.

use super::{ListId, TaskId};
use std::fmt;
use thiserror::Error;

/// Coarse classification shared by every error surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty required text, duplicate identifier, or malformed identifier.
    InvalidInput,
    /// The operation targets a task that does not exist.
    NotFound,
    /// The list identifier is outside the board's fixed set.
    UnknownList,
    /// A position lies outside the current bounds of a list.
    IndexOutOfRange,
    /// The persistence adapter failed or timed out.
    PersistenceFailure,
    /// The board could not be loaded at session start.
    LoadFailed,
    /// The controller is not in a state that accepts the request.
    NotReady,
}

impl ErrorKind {
    /// Returns a stable machine-readable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::UnknownList => "unknown_list",
            Self::IndexOutOfRange => "index_out_of_range",
            Self::PersistenceFailure => "persistence_failure",
            Self::LoadFailed => "load_failed",
            Self::NotReady => "not_ready",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned while constructing board values or applying mutations.
///
/// A failed transition never leaves a partially mutated board behind: the
/// caller keeps the board it passed in.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BoardDomainError {
    /// Task text is empty after trimming.
    #[error("task text must not be empty")]
    EmptyText,

    /// The task identifier is empty after trimming.
    #[error("invalid task identifier '{0}'")]
    InvalidTaskId(String),

    /// The list identifier is empty or contains unsupported characters.
    #[error("invalid list identifier '{0}', expected [A-Za-z0-9_-]+")]
    InvalidListId(String),

    /// The same list identifier was declared twice.
    #[error("duplicate list identifier: {0}")]
    DuplicateList(ListId),

    /// A task with the same identifier already exists on the board.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// No task with the identifier exists on the board.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The list identifier is not one of the board's lists.
    #[error("unknown list: {0}")]
    UnknownList(ListId),

    /// The position is outside the list's current bounds.
    #[error("index {index} out of range for list {list} of length {len}")]
    IndexOutOfRange {
        /// List the position refers to.
        list: ListId,
        /// Requested position.
        index: usize,
        /// Current list length.
        len: usize,
    },
}

impl BoardDomainError {
    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyText
            | Self::InvalidTaskId(_)
            | Self::InvalidListId(_)
            | Self::DuplicateList(_)
            | Self::DuplicateTask(_) => ErrorKind::InvalidInput,
            Self::TaskNotFound(_) => ErrorKind::NotFound,
            Self::UnknownList(_) => ErrorKind::UnknownList,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
        }
    }
}

/// A board structure that breaks one of the membership or ordering
/// invariants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    /// A list appears more than once.
    #[error("list {0} appears more than once")]
    DuplicateList(ListId),

    /// A task identifier appears more than once across the board.
    #[error("task {0} appears more than once")]
    DuplicateTask(TaskId),

    /// A task records a list other than the one containing it.
    #[error("task {task} is stored in {container} but records list {recorded}")]
    ListMismatch {
        /// Offending task.
        task: TaskId,
        /// List that actually contains the task.
        container: ListId,
        /// List recorded on the task.
        recorded: ListId,
    },

    /// Order values in a list are not the contiguous sequence `0..n`.
    #[error("task {task} in list {list} has order {found}, expected {expected}")]
    OrderGap {
        /// List with the gap.
        list: ListId,
        /// Offending task.
        task: TaskId,
        /// Position the task occupies.
        expected: usize,
        /// Order value recorded on the task.
        found: usize,
    },
}
