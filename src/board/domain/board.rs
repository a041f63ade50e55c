//! Board aggregate: the fixed set of lists and their ordered tasks.

use super::{BoardDomainError, InvariantViolation, ListId, Task, TaskId};
use serde::Serialize;
use std::collections::HashSet;

/// One work stage and its tasks, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskList {
    id: ListId,
    tasks: Vec<Task>,
}

impl TaskList {
    pub(crate) const fn new(id: ListId) -> Self {
        Self {
            id,
            tasks: Vec::new(),
        }
    }

    pub(crate) const fn with_tasks(id: ListId, tasks: Vec<Task>) -> Self {
        Self { id, tasks }
    }

    /// Returns the list identifier.
    #[must_use]
    pub const fn id(&self) -> &ListId {
        &self.id
    }

    /// Returns the tasks in order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Returns the number of tasks in the list.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` when the list holds no tasks.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) const fn tasks_mut(&mut self) -> &mut Vec<Task> {
        &mut self.tasks
    }

    /// Reassigns `order` as `0..n` in current relative order and stamps every
    /// task with this list's identifier.
    pub(crate) fn renumber(&mut self) {
        let Self { id, tasks } = self;
        for (order, task) in tasks.iter_mut().enumerate() {
            task.set_placement(id, order);
        }
    }
}

/// Where a task currently sits on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskLocation<'a> {
    /// The task itself.
    pub task: &'a Task,
    /// The list containing the task.
    pub list_id: &'a ListId,
    /// Zero-based position inside the list.
    pub index: usize,
}

/// In-memory board: a fixed, ordered set of lists.
///
/// Boards are immutable values. Every transition produces a new board through
/// the functions in [`reorder`](super::reorder); nothing else splices tasks or
/// reassigns their placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    lists: Vec<TaskList>,
}

impl Board {
    /// Creates a board with one empty list per identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::DuplicateList`] when an identifier is
    /// repeated.
    pub fn new(list_ids: impl IntoIterator<Item = ListId>) -> Result<Self, BoardDomainError> {
        let mut seen = HashSet::new();
        let mut lists = Vec::new();
        for id in list_ids {
            if !seen.insert(id.clone()) {
                return Err(BoardDomainError::DuplicateList(id));
            }
            lists.push(TaskList::new(id));
        }
        Ok(Self { lists })
    }

    /// Builds a board from populated lists, rejecting structures that break
    /// the membership or ordering invariants.
    pub(crate) fn from_lists(lists: Vec<TaskList>) -> Result<Self, InvariantViolation> {
        let board = Self { lists };
        board.check_invariants()?;
        Ok(board)
    }

    /// Wraps lists produced by the reorder engine, which renumbers every list
    /// it touches.
    pub(crate) const fn from_renumbered(lists: Vec<TaskList>) -> Self {
        Self { lists }
    }

    /// Returns the list identifiers in display order.
    pub fn list_ids(&self) -> impl Iterator<Item = &ListId> {
        self.lists.iter().map(TaskList::id)
    }

    /// Returns every list in display order.
    #[must_use]
    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    /// Returns the list with the given identifier.
    #[must_use]
    pub fn list(&self, id: &ListId) -> Option<&TaskList> {
        self.lists.iter().find(|list| list.id() == id)
    }

    /// Returns `true` when `id` is one of the board's lists.
    #[must_use]
    pub fn contains_list(&self, id: &ListId) -> bool {
        self.list(id).is_some()
    }

    /// Returns the ordered tasks of a list.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::UnknownList`] when `id` is not one of the
    /// board's lists.
    pub fn tasks_in(&self, id: &ListId) -> Result<&[Task], BoardDomainError> {
        self.list(id)
            .map(TaskList::tasks)
            .ok_or_else(|| BoardDomainError::UnknownList(id.clone()))
    }

    /// Locates a task anywhere on the board.
    ///
    /// Returns `None` when no task carries the identifier.
    #[must_use]
    pub fn find_task(&self, id: &TaskId) -> Option<TaskLocation<'_>> {
        self.lists.iter().find_map(|list| {
            list.tasks()
                .iter()
                .position(|task| task.id() == id)
                .and_then(|index| {
                    list.tasks().get(index).map(|task| TaskLocation {
                        task,
                        list_id: list.id(),
                        index,
                    })
                })
        })
    }

    /// Returns the total number of tasks across all lists.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.lists.iter().map(TaskList::len).sum()
    }

    /// Verifies that every task sits in exactly one list, carries a unique
    /// identifier, and that each list is numbered `0..n` without gaps.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] encountered.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let mut seen_lists = HashSet::new();
        let mut seen_tasks = HashSet::new();
        for list in &self.lists {
            if !seen_lists.insert(list.id()) {
                return Err(InvariantViolation::DuplicateList(list.id().clone()));
            }
            for (expected, task) in list.tasks().iter().enumerate() {
                if !seen_tasks.insert(task.id()) {
                    return Err(InvariantViolation::DuplicateTask(task.id().clone()));
                }
                if task.list_id() != list.id() {
                    return Err(InvariantViolation::ListMismatch {
                        task: task.id().clone(),
                        container: list.id().clone(),
                        recorded: task.list_id().clone(),
                    });
                }
                if task.order() != expected {
                    return Err(InvariantViolation::OrderGap {
                        list: list.id().clone(),
                        task: task.id().clone(),
                        expected,
                        found: task.order(),
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn into_lists(self) -> Vec<TaskList> {
        self.lists
    }
}
