//! Host-facing triggers that translate UI gestures into board mutations.

use std::sync::Arc;

use mockable::Clock;
use tracing::debug;

use crate::board::{
    domain::{Board, BoardDomainError, ListId, Mutation, NewTask, TaskId},
    ports::SnapshotStore,
};
use crate::config::{BoardConfig, BoardConfigError};

use super::sync::{SyncController, SyncError, SyncResult};

/// End of a drag gesture as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragEnd {
    /// List the task was picked up from.
    pub source_list: ListId,
    /// Position the task was picked up from.
    pub source_index: usize,
    /// Drop target, `None` when dropped outside any target.
    pub destination_list: Option<ListId>,
    /// Drop position, `None` for "at the end".
    pub destination_index: Option<usize>,
}

impl DragEnd {
    /// Starts a drag from `source_list` at `source_index` with no drop target.
    #[must_use]
    pub const fn new(source_list: ListId, source_index: usize) -> Self {
        Self {
            source_list,
            source_index,
            destination_list: None,
            destination_index: None,
        }
    }

    /// Sets the drop target.
    #[must_use]
    pub fn dropped_on(mut self, list: ListId, index: Option<usize>) -> Self {
        self.destination_list = Some(list);
        self.destination_index = index;
        self
    }
}

/// Result of handling a drag gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Dropped outside any target; nothing changed.
    Cancelled,
    /// Dropped back where it started; nothing changed.
    Unchanged,
    /// The task moved.
    Moved {
        /// Board after the move.
        board: Arc<Board>,
    },
    /// The task was dropped on the delete zone and removed.
    Deleted {
        /// Identifier of the removed task.
        task_id: TaskId,
        /// Board after the removal.
        board: Arc<Board>,
    },
}

#[derive(Debug)]
enum DragPlan {
    Cancel,
    Stay,
    Delete(TaskId),
    Move(Mutation),
}

fn plan_drag(
    board: &Board,
    config: &BoardConfig,
    drag: DragEnd,
) -> Result<DragPlan, BoardDomainError> {
    let Some(destination) = drag.destination_list else {
        return Ok(DragPlan::Cancel);
    };
    let source_tasks = board.tasks_in(&drag.source_list)?;
    let dragged = source_tasks.get(drag.source_index).ok_or_else(|| {
        BoardDomainError::IndexOutOfRange {
            list: drag.source_list.clone(),
            index: drag.source_index,
            len: source_tasks.len(),
        }
    })?;

    if config.is_delete_zone(&destination) {
        return Ok(DragPlan::Delete(dragged.id().clone()));
    }

    if destination == drag.source_list {
        let to_index = drag
            .destination_index
            .unwrap_or_else(|| source_tasks.len().saturating_sub(1));
        if to_index == drag.source_index {
            return Ok(DragPlan::Stay);
        }
        return Ok(DragPlan::Move(Mutation::MoveWithinList {
            list_id: destination,
            from_index: drag.source_index,
            to_index,
        }));
    }

    Ok(DragPlan::Move(Mutation::MoveAcrossLists {
        from_list: drag.source_list,
        from_index: drag.source_index,
        to_list: destination,
        to_index: drag.destination_index.unwrap_or(usize::MAX),
    }))
}

impl<S, C> SyncController<S, C>
where
    S: SnapshotStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Adds a task with `text` to the end of the intake list.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Board`] with `EmptyText` for blank input, or
    /// any error from [`apply`](Self::apply).
    pub fn on_add_task(&self, text: &str) -> SyncResult<TaskId> {
        let task = NewTask::with_generated_id(text)?;
        let task_id = task.id().clone();
        let Some(list_id) = self.config().intake_list().cloned() else {
            return Err(SyncError::Config(BoardConfigError::NoLists));
        };
        self.apply(Mutation::Insert { list_id, task })?;
        Ok(task_id)
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Board`] with `TaskNotFound` for an unknown id.
    pub fn on_delete_task(&self, task_id: &TaskId) -> SyncResult<Arc<Board>> {
        self.apply(Mutation::Remove {
            task_id: task_id.clone(),
        })
    }

    /// Flips a task's completion flag.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Board`] with `TaskNotFound` for an unknown id.
    pub fn on_toggle_complete(&self, task_id: &TaskId) -> SyncResult<Arc<Board>> {
        self.apply(Mutation::ToggleCompleted {
            task_id: task_id.clone(),
        })
    }

    /// Replaces a task's text. Blank text leaves the task unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Board`] with `TaskNotFound` for an unknown id.
    pub fn on_edit_text(&self, task_id: &TaskId, text: &str) -> SyncResult<Arc<Board>> {
        self.apply(Mutation::EditText {
            task_id: task_id.clone(),
            text: text.to_owned(),
        })
    }

    /// Handles the end of a drag gesture.
    ///
    /// The drop is resolved against the same board it is applied to.
    /// Dropping outside any target cancels. Dropping on the configured delete
    /// zone removes the task. A missing destination index places the task at
    /// the end of the destination list.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Board`] for an unknown list or an out-of-range
    /// index, and [`SyncError::NotReady`] outside `Ready`/`Mutating`.
    pub fn on_drag_end(&self, drag: DragEnd) -> SyncResult<DragOutcome> {
        let (plan, board) = self.apply_with(|board| {
            let plan = plan_drag(board, self.config(), drag)?;
            debug!(?plan, "drag resolved");
            let mutation = match &plan {
                DragPlan::Cancel | DragPlan::Stay => None,
                DragPlan::Delete(task_id) => Some(Mutation::Remove {
                    task_id: task_id.clone(),
                }),
                DragPlan::Move(mutation) => Some(mutation.clone()),
            };
            Ok((mutation, plan))
        })?;

        Ok(match plan {
            DragPlan::Cancel => DragOutcome::Cancelled,
            DragPlan::Stay => DragOutcome::Unchanged,
            DragPlan::Delete(task_id) => DragOutcome::Deleted { task_id, board },
            DragPlan::Move(_) => DragOutcome::Moved { board },
        })
    }
}
