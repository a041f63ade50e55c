//! Task entity and the validated payload used to create one.

use super::{BoardDomainError, ListId, TaskId};
use serde::Serialize;

/// A discrete work item placed on the board.
///
/// `list_id` and `order` describe the task's current placement. They are
/// assigned by the reorder engine and are never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: TaskId,
    text: String,
    completed: bool,
    list_id: ListId,
    order: usize,
}

impl Task {
    /// Places a new task at the given position.
    pub(crate) fn place(new_task: NewTask, list_id: ListId, order: usize) -> Self {
        Self {
            id: new_task.id,
            text: new_task.text,
            completed: new_task.completed,
            list_id,
            order,
        }
    }

    /// Reconstructs a task read back from a snapshot. Placement is checked by
    /// the board that receives it.
    pub(crate) const fn restore(
        id: TaskId,
        text: String,
        completed: bool,
        list_id: ListId,
        order: usize,
    ) -> Self {
        Self {
            id,
            text,
            completed,
            list_id,
            order,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the task label.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` once the task has been marked done.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.completed
    }

    /// Returns the list currently containing the task.
    #[must_use]
    pub const fn list_id(&self) -> &ListId {
        &self.list_id
    }

    /// Returns the zero-based position inside the containing list.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    pub(crate) fn set_placement(&mut self, list_id: &ListId, order: usize) {
        if &self.list_id != list_id {
            self.list_id = list_id.clone();
        }
        self.order = order;
    }

    pub(crate) const fn toggle(&mut self) {
        self.completed = !self.completed;
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.text = text;
    }
}

/// Validated payload for a task that has not been placed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    id: TaskId,
    text: String,
    completed: bool,
}

impl NewTask {
    /// Creates a task payload with the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyText`] if `text` is empty after
    /// trimming.
    pub fn new(id: TaskId, text: impl Into<String>) -> Result<Self, BoardDomainError> {
        let label = normalize_text(text.into()).ok_or(BoardDomainError::EmptyText)?;
        Ok(Self {
            id,
            text: label,
            completed: false,
        })
    }

    /// Creates a task payload with a freshly generated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyText`] if `text` is empty after
    /// trimming.
    pub fn with_generated_id(text: impl Into<String>) -> Result<Self, BoardDomainError> {
        Self::new(TaskId::new(), text)
    }

    /// Sets the initial completion flag.
    #[must_use]
    pub const fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Returns the identifier the task will carry.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the normalized label.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Trims `text`, returning `None` when nothing is left.
pub(crate) fn normalize_text(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.len() == text.len() {
        return Some(text);
    }
    Some(trimmed.to_owned())
}
