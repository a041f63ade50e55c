//! Board mutations produced by external triggers.

use super::{ListId, NewTask, TaskId};

/// A single requested change to the board.
///
/// Mutations are plain data; [`reorder::apply`](super::reorder::apply) turns
/// one into the next board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Append a task to the end of a list.
    Insert {
        /// Destination list.
        list_id: ListId,
        /// Task to place.
        task: NewTask,
    },
    /// Delete a task wherever it is found.
    Remove {
        /// Task to delete.
        task_id: TaskId,
    },
    /// Move a task to another position in the same list.
    MoveWithinList {
        /// List containing the task.
        list_id: ListId,
        /// Current position.
        from_index: usize,
        /// Requested position.
        to_index: usize,
    },
    /// Move a task to a position in another list.
    MoveAcrossLists {
        /// Source list.
        from_list: ListId,
        /// Position in the source list.
        from_index: usize,
        /// Destination list.
        to_list: ListId,
        /// Requested position in the destination list, clamped to its length.
        to_index: usize,
    },
    /// Flip a task's completion flag.
    ToggleCompleted {
        /// Task to toggle.
        task_id: TaskId,
    },
    /// Replace a task's label; blank labels are ignored.
    EditText {
        /// Task to edit.
        task_id: TaskId,
        /// Replacement label.
        text: String,
    },
}

impl Mutation {
    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
            Self::MoveWithinList { .. } => "move_within_list",
            Self::MoveAcrossLists { .. } => "move_across_lists",
            Self::ToggleCompleted { .. } => "toggle_completed",
            Self::EditText { .. } => "edit_text",
        }
    }
}
