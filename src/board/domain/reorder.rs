//! Pure transition functions over [`Board`] values.
//!
//! Every function borrows the current board and returns a new one. On error
//! the caller's board is untouched. Whenever a list's membership changes it
//! is renumbered by a single linear scan, so `order` is always `0..n` in
//! relative order.

use super::task::normalize_text;
use super::{Board, BoardDomainError, ListId, Mutation, NewTask, Task, TaskId, TaskList};

/// Applies a mutation to `board`.
///
/// # Errors
///
/// Returns the error of the underlying transition.
pub fn apply(board: &Board, mutation: Mutation) -> Result<Board, BoardDomainError> {
    match mutation {
        Mutation::Insert { list_id, task } => insert(board, &list_id, task),
        Mutation::Remove { task_id } => remove(board, &task_id),
        Mutation::MoveWithinList {
            list_id,
            from_index,
            to_index,
        } => move_within_list(board, &list_id, from_index, to_index),
        Mutation::MoveAcrossLists {
            from_list,
            from_index,
            to_list,
            to_index,
        } => move_across_lists(board, &from_list, from_index, &to_list, to_index),
        Mutation::ToggleCompleted { task_id } => toggle_completed(board, &task_id),
        Mutation::EditText { task_id, text } => edit_text(board, &task_id, &text),
    }
}

/// Appends `task` to the end of `list_id`.
///
/// # Errors
///
/// Returns [`BoardDomainError::UnknownList`] for an unknown list or
/// [`BoardDomainError::DuplicateTask`] when the identifier is already on the
/// board.
pub fn insert(board: &Board, list_id: &ListId, task: NewTask) -> Result<Board, BoardDomainError> {
    if board.find_task(task.id()).is_some() {
        return Err(BoardDomainError::DuplicateTask(task.id().clone()));
    }
    let mut lists = board.clone().into_lists();
    let list = list_mut(&mut lists, list_id)?;
    let order = list.len();
    list.tasks_mut().push(Task::place(task, list_id.clone(), order));
    Ok(rebuild(lists))
}

/// Deletes a task and renumbers the list that contained it.
///
/// # Errors
///
/// Returns [`BoardDomainError::TaskNotFound`] when the task is absent,
/// including on a second removal of the same identifier.
pub fn remove(board: &Board, task_id: &TaskId) -> Result<Board, BoardDomainError> {
    let (list_id, index) = locate(board, task_id)?;
    let mut lists = board.clone().into_lists();
    let list = list_mut(&mut lists, &list_id)?;
    take_at(list, index)?;
    list.renumber();
    Ok(rebuild(lists))
}

/// Moves the task at `from_index` to `to_index` within one list.
///
/// Moving a task onto its own position succeeds and leaves the board
/// unchanged.
///
/// # Errors
///
/// Returns [`BoardDomainError::UnknownList`] for an unknown list or
/// [`BoardDomainError::IndexOutOfRange`] when either index is outside
/// `0..len`.
pub fn move_within_list(
    board: &Board,
    list_id: &ListId,
    from_index: usize,
    to_index: usize,
) -> Result<Board, BoardDomainError> {
    let len = board.tasks_in(list_id)?.len();
    ensure_index(list_id, from_index, len)?;
    ensure_index(list_id, to_index, len)?;
    if from_index == to_index {
        return Ok(board.clone());
    }
    let mut lists = board.clone().into_lists();
    let list = list_mut(&mut lists, list_id)?;
    let task = take_at(list, from_index)?;
    list.tasks_mut().insert(to_index, task);
    list.renumber();
    Ok(rebuild(lists))
}

/// Moves the task at `from_index` of `from_list` into `to_list`.
///
/// `to_index` is clamped to `0..=len` of the destination. Both lists are
/// renumbered. When both lists are the same this behaves like
/// [`move_within_list`] with the destination clamped to the last position.
///
/// # Errors
///
/// Returns [`BoardDomainError::UnknownList`] when either list is unknown or
/// [`BoardDomainError::IndexOutOfRange`] when `from_index` is outside the
/// source list.
pub fn move_across_lists(
    board: &Board,
    from_list: &ListId,
    from_index: usize,
    to_list: &ListId,
    to_index: usize,
) -> Result<Board, BoardDomainError> {
    let source_len = board.tasks_in(from_list)?.len();
    let destination_len = board.tasks_in(to_list)?.len();
    ensure_index(from_list, from_index, source_len)?;
    if from_list == to_list {
        let last = source_len.saturating_sub(1);
        return move_within_list(board, from_list, from_index, to_index.min(last));
    }

    let mut lists = board.clone().into_lists();
    let source = list_mut(&mut lists, from_list)?;
    let task = take_at(source, from_index)?;
    source.renumber();

    let destination = list_mut(&mut lists, to_list)?;
    destination
        .tasks_mut()
        .insert(to_index.min(destination_len), task);
    destination.renumber();
    Ok(rebuild(lists))
}

/// Flips the completion flag of a task without touching its placement.
///
/// # Errors
///
/// Returns [`BoardDomainError::TaskNotFound`] when the task is absent.
pub fn toggle_completed(board: &Board, task_id: &TaskId) -> Result<Board, BoardDomainError> {
    update_task(board, task_id, Task::toggle)
}

/// Replaces the label of a task.
///
/// Blank replacements are discarded: the board comes back unchanged. This
/// mirrors creation, which refuses blank labels outright.
///
/// # Errors
///
/// Returns [`BoardDomainError::TaskNotFound`] when the task is absent.
pub fn edit_text(
    board: &Board,
    task_id: &TaskId,
    new_text: &str,
) -> Result<Board, BoardDomainError> {
    let Some(text) = normalize_text(new_text.to_owned()) else {
        locate(board, task_id)?;
        return Ok(board.clone());
    };
    update_task(board, task_id, move |task| task.set_text(text))
}

fn update_task(
    board: &Board,
    task_id: &TaskId,
    update: impl FnOnce(&mut Task),
) -> Result<Board, BoardDomainError> {
    let (list_id, index) = locate(board, task_id)?;
    let mut lists = board.clone().into_lists();
    let list = list_mut(&mut lists, &list_id)?;
    let task = list
        .tasks_mut()
        .get_mut(index)
        .ok_or_else(|| BoardDomainError::TaskNotFound(task_id.clone()))?;
    update(task);
    Ok(rebuild(lists))
}

fn locate(board: &Board, task_id: &TaskId) -> Result<(ListId, usize), BoardDomainError> {
    board
        .find_task(task_id)
        .map(|location| (location.list_id.clone(), location.index))
        .ok_or_else(|| BoardDomainError::TaskNotFound(task_id.clone()))
}

fn list_mut<'a>(
    lists: &'a mut [TaskList],
    list_id: &ListId,
) -> Result<&'a mut TaskList, BoardDomainError> {
    lists
        .iter_mut()
        .find(|list| list.id() == list_id)
        .ok_or_else(|| BoardDomainError::UnknownList(list_id.clone()))
}

fn take_at(list: &mut TaskList, index: usize) -> Result<Task, BoardDomainError> {
    ensure_index(list.id(), index, list.len())?;
    Ok(list.tasks_mut().remove(index))
}

fn ensure_index(list_id: &ListId, index: usize, len: usize) -> Result<(), BoardDomainError> {
    if index >= len {
        return Err(BoardDomainError::IndexOutOfRange {
            list: list_id.clone(),
            index,
            len,
        });
    }
    Ok(())
}

fn rebuild(lists: Vec<TaskList>) -> Board {
    let board = Board::from_renumbered(lists);
    debug_assert!(board.check_invariants().is_ok());
    board
}
