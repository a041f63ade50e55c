//! Unit tests for the board module.


use crate::board::domain::{Board, ListId, NewTask, TaskId, reorder};

pub(super) fn list(id: &str) -> ListId {
    ListId::new(id).expect("valid list id")
}

pub(super) fn task_id(id: &str) -> TaskId {
    TaskId::parse(id).expect("valid task id")
}

pub(super) fn default_lists() -> Vec<ListId> {
    vec![list("todo"), list("proceso"), list("delegadas")]
}

/// Builds a three-list board whose tasks carry the given identifiers, with
/// text `"task <id>"`.
pub(super) fn board_with(entries: &[(&str, &[&str])]) -> Board {
    let mut board = Board::new(default_lists()).expect("valid board");
    for (list_id, ids) in entries {
        for id in *ids {
            let task = NewTask::new(task_id(id), format!("task {id}")).expect("valid task");
            board = reorder::insert(&board, &list(list_id), task).expect("insert task");
        }
    }
    board
}

pub(super) fn ids_in(board: &Board, list_id: &str) -> Vec<String> {
    board
        .tasks_in(&list(list_id))
        .expect("known list")
        .iter()
        .map(|task| task.id().as_str().to_owned())
        .collect()
}
