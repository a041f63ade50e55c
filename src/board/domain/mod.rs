//! Domain model for the task board.
//!
//! The board is a fixed set of ordered lists. All transitions live in
//! [`reorder`] as pure functions; persistence formats live in [`snapshot`].
//! Nothing in this module performs I/O.

mod board;
mod error;
mod ids;
mod mutation;
pub mod reorder;
pub mod snapshot;
mod task;

pub use board::{Board, TaskList, TaskLocation};
pub use error::{BoardDomainError, ErrorKind, InvariantViolation};
pub use ids::{ListId, TaskId};
pub use mutation::Mutation;
pub use snapshot::{
    BoardSnapshot, FlatSnapshot, FlatTaskRecord, ListSnapshot, SnapshotError, SnapshotLayout,
    TaskRecord,
};
pub use task::{NewTask, Task};
