//! Persisted board representation and its JSON codec.
//!
//! The canonical layout nests tasks under their list:
//!
//! ```json
//! { "schema_version": 2, "revision": 4, "lists": [
//!     { "id": "todo", "tasks": [ { "id": "a", "text": "buy milk", "completed": false, "order": 0 } ] }
//! ] }
//! ```
//!
//! The flat layout carries the same records with an explicit `list_id`
//! instead. Schema version 1 is the bare array written by the first release
//! (`[{ "id": 1700000000000, "text": "...", "column": "todo" }]`); it is
//! upgraded on decode by taking array order as list order.

use super::{Board, InvariantViolation, ListId, Task, TaskId, TaskList};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Schema version written by this release.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Errors raised while decoding or restoring a snapshot.
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    /// The document is not valid JSON or does not match the schema.
    #[error("snapshot does not match the schema: {0}")]
    Json(Arc<serde_json::Error>),

    /// The document is structurally unusable.
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    /// The schema version is not supported by this release.
    #[error("unsupported snapshot schema version {0}")]
    UnsupportedVersion(u64),

    /// The snapshot references a list outside the configured set.
    #[error("snapshot references unknown list: {0}")]
    UnknownList(ListId),

    /// The snapshot declares the same list twice.
    #[error("snapshot declares list {0} more than once")]
    DuplicateList(ListId),

    /// The restored board would break membership or ordering invariants.
    #[error("snapshot breaks board invariants: {0}")]
    Invariant(#[from] InvariantViolation),
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

/// On-disk layout used when encoding snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotLayout {
    /// Tasks nested under their list.
    #[default]
    Nested,
    /// One flat sequence of tasks, each naming its list.
    Flat,
}

/// Complete persisted board in the canonical nested layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardSnapshot {
    /// Schema version of the document.
    pub schema_version: u32,
    /// Local revision the snapshot was captured at.
    pub revision: u64,
    /// When the snapshot was captured, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    /// Lists in display order.
    pub lists: Vec<ListSnapshot>,
}

/// One list inside a [`BoardSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListSnapshot {
    /// List identifier.
    pub id: ListId,
    /// Tasks of the list.
    pub tasks: Vec<TaskRecord>,
}

/// One task inside a [`ListSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskRecord {
    /// Task identifier.
    pub id: TaskId,
    /// Task label.
    pub text: String,
    /// Completion flag.
    pub completed: bool,
    /// Position inside the list.
    pub order: usize,
}

/// Complete persisted board in the flat layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlatSnapshot {
    /// Schema version of the document.
    pub schema_version: u32,
    /// Local revision the snapshot was captured at.
    pub revision: u64,
    /// When the snapshot was captured, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    /// Every task on the board.
    pub tasks: Vec<FlatTaskRecord>,
}

/// One task inside a [`FlatSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlatTaskRecord {
    /// Task identifier.
    pub id: TaskId,
    /// Task label.
    pub text: String,
    /// Completion flag.
    pub completed: bool,
    /// List containing the task.
    pub list_id: ListId,
    /// Position inside the list.
    pub order: usize,
}

impl BoardSnapshot {
    /// Captures the full state of `board`.
    #[must_use]
    pub fn capture(board: &Board, revision: u64, saved_at: DateTime<Utc>) -> Self {
        let lists = board
            .lists()
            .iter()
            .map(|list| ListSnapshot {
                id: list.id().clone(),
                tasks: list
                    .tasks()
                    .iter()
                    .map(|task| TaskRecord {
                        id: task.id().clone(),
                        text: task.text().to_owned(),
                        completed: task.completed(),
                        order: task.order(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            revision,
            saved_at: Some(saved_at),
            lists,
        }
    }

    /// Rebuilds a board whose lists are exactly `list_ids`, in that order.
    ///
    /// Lists missing from the snapshot come back empty. Tasks are ordered by
    /// their recorded `order`, which must form `0..n` in every list.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the schema version is unsupported, a
    /// list is unknown or repeated, a task has blank text, or the tasks break
    /// the board invariants.
    pub fn restore(self, list_ids: &[ListId]) -> Result<Board, SnapshotError> {
        if self.schema_version != CURRENT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion(u64::from(self.schema_version)));
        }

        let mut by_list: HashMap<ListId, Vec<TaskRecord>> = HashMap::new();
        for list in self.lists {
            if !list_ids.contains(&list.id) {
                return Err(SnapshotError::UnknownList(list.id));
            }
            if by_list.contains_key(&list.id) {
                return Err(SnapshotError::DuplicateList(list.id));
            }
            by_list.insert(list.id, list.tasks);
        }

        let lists = list_ids
            .iter()
            .map(|list_id| {
                let mut records = by_list.remove(list_id).unwrap_or_default();
                records.sort_by_key(|record| record.order);
                let tasks = records
                    .into_iter()
                    .map(|record| {
                        if record.text.trim().is_empty() {
                            return Err(SnapshotError::Malformed(format!(
                                "task {} has blank text",
                                record.id
                            )));
                        }
                        Ok(Task::restore(
                            record.id,
                            record.text,
                            record.completed,
                            list_id.clone(),
                            record.order,
                        ))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TaskList::with_tasks(list_id.clone(), tasks))
            })
            .collect::<Result<Vec<_>, SnapshotError>>()?;

        Board::from_lists(lists).map_err(SnapshotError::from)
    }

    /// Converts the snapshot into the flat layout.
    #[must_use]
    pub fn to_flat(&self) -> FlatSnapshot {
        let tasks = self
            .lists
            .iter()
            .flat_map(|list| {
                list.tasks.iter().map(|record| FlatTaskRecord {
                    id: record.id.clone(),
                    text: record.text.clone(),
                    completed: record.completed,
                    list_id: list.id.clone(),
                    order: record.order,
                })
            })
            .collect();
        FlatSnapshot {
            schema_version: self.schema_version,
            revision: self.revision,
            saved_at: self.saved_at,
            tasks,
        }
    }
}

impl FlatSnapshot {
    /// Groups the flat records by list, in order of first appearance.
    ///
    /// Lists without tasks do not appear; [`BoardSnapshot::restore`] fills
    /// them in as empty lists.
    #[must_use]
    pub fn into_nested(self) -> BoardSnapshot {
        let mut lists: Vec<ListSnapshot> = Vec::new();
        for record in self.tasks {
            let task = TaskRecord {
                id: record.id,
                text: record.text,
                completed: record.completed,
                order: record.order,
            };
            match lists.iter_mut().find(|list| list.id == record.list_id) {
                Some(list) => list.tasks.push(task),
                None => lists.push(ListSnapshot {
                    id: record.list_id,
                    tasks: vec![task],
                }),
            }
        }
        BoardSnapshot {
            schema_version: self.schema_version,
            revision: self.revision,
            saved_at: self.saved_at,
            lists,
        }
    }
}

/// Identifier written by the first release, usually a millisecond timestamp.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct LegacyTaskRecord {
    id: LegacyId,
    text: String,
    column: ListId,
}

/// Decodes a snapshot document in any supported layout or schema version.
///
/// # Errors
///
/// Returns [`SnapshotError`] when the document is not JSON, does not match
/// any supported layout, or carries an unsupported schema version.
pub fn decode(bytes: &[u8]) -> Result<BoardSnapshot, SnapshotError> {
    let value: Value = serde_json::from_slice(bytes)?;
    if value.is_array() {
        return upgrade_legacy(serde_json::from_value(value)?);
    }
    let Some(fields) = value.as_object() else {
        return Err(SnapshotError::Malformed(
            "expected a JSON object or array".to_owned(),
        ));
    };
    let version = fields
        .get("schema_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| SnapshotError::Malformed("missing schema_version".to_owned()))?;
    if version != u64::from(CURRENT_SCHEMA_VERSION) {
        return Err(SnapshotError::UnsupportedVersion(version));
    }
    let is_nested = fields.contains_key("lists");
    let is_flat = fields.contains_key("tasks");

    if is_nested {
        Ok(serde_json::from_value(value)?)
    } else if is_flat {
        let flat: FlatSnapshot = serde_json::from_value(value)?;
        Ok(flat.into_nested())
    } else {
        Err(SnapshotError::Malformed(
            "expected a 'lists' or 'tasks' field".to_owned(),
        ))
    }
}

/// Encodes a snapshot in the requested layout.
///
/// # Errors
///
/// Returns [`SnapshotError::Json`] if serialization fails.
pub fn encode(snapshot: &BoardSnapshot, layout: SnapshotLayout) -> Result<Vec<u8>, SnapshotError> {
    let bytes = match layout {
        SnapshotLayout::Nested => serde_json::to_vec_pretty(snapshot)?,
        SnapshotLayout::Flat => serde_json::to_vec_pretty(&snapshot.to_flat())?,
    };
    Ok(bytes)
}

fn upgrade_legacy(records: Vec<LegacyTaskRecord>) -> Result<BoardSnapshot, SnapshotError> {
    let mut flat = Vec::with_capacity(records.len());
    let mut next_order: HashMap<ListId, usize> = HashMap::new();
    for record in records {
        let raw_id = match record.id {
            LegacyId::Number(number) => number.to_string(),
            LegacyId::Text(text) => text,
        };
        let id = TaskId::parse(raw_id).map_err(|err| SnapshotError::Malformed(err.to_string()))?;
        let slot = next_order.entry(record.column.clone()).or_insert(0);
        let order = *slot;
        *slot += 1;
        flat.push(FlatTaskRecord {
            id,
            text: record.text,
            completed: false,
            list_id: record.column,
            order,
        });
    }
    let snapshot = FlatSnapshot {
        schema_version: CURRENT_SCHEMA_VERSION,
        revision: 0,
        saved_at: None,
        tasks: flat,
    };
    Ok(snapshot.into_nested())
}
