//! Board configuration.
//!
//! Configuration is plain data with a [`Default`] describing the classic
//! three-stage board (`todo`, `proceso`, `delegadas`). It can be read from a
//! JSON document; every loader validates before returning.

use crate::board::domain::{ErrorKind, ListId, SnapshotLayout};
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Default capacity of the sync event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Errors returned while loading or validating configuration.
#[derive(Debug, Error)]
pub enum BoardConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document is not valid JSON or has unknown fields.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// No lists were configured.
    #[error("at least one list must be configured")]
    NoLists,

    /// A list identifier is declared twice.
    #[error("list {0} is configured more than once")]
    DuplicateList(ListId),

    /// The intake list is not one of the configured lists.
    #[error("intake list {0} is not a configured list")]
    UnknownIntakeList(ListId),

    /// The delete zone shares an identifier with a real list.
    #[error("delete zone {0} must not be one of the configured lists")]
    DeleteZoneIsList(ListId),

    /// The event channel capacity is zero.
    #[error("event_capacity must be greater than zero")]
    ZeroEventCapacity,
}

impl BoardConfigError {
    /// Returns the taxonomy bucket for this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::PersistenceFailure,
            _ => ErrorKind::InvalidInput,
        }
    }
}

/// Board and sync controller settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Lists in display order.
    pub lists: Vec<ListId>,
    /// List receiving newly added tasks. Defaults to the first list.
    pub intake_list: Option<ListId>,
    /// Drop target that deletes the dragged task instead of moving it.
    pub delete_zone: Option<ListId>,
    /// Capacity of the sync event channel.
    pub event_capacity: usize,
    /// Layout used by file-backed snapshot stores opened with
    /// [`JsonFileSnapshotStore::from_config`](crate::board::adapters::json_file::JsonFileSnapshotStore::from_config).
    pub snapshot_layout: SnapshotLayout,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            lists: vec![
                ListId::known("todo"),
                ListId::known("proceso"),
                ListId::known("delegadas"),
            ],
            intake_list: None,
            delete_zone: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            snapshot_layout: SnapshotLayout::Nested,
        }
    }
}

impl BoardConfig {
    /// Replaces the configured lists.
    #[must_use]
    pub fn with_lists(mut self, lists: impl IntoIterator<Item = ListId>) -> Self {
        self.lists = lists.into_iter().collect();
        self
    }

    /// Sets the list receiving newly added tasks.
    #[must_use]
    pub fn with_intake_list(mut self, list: ListId) -> Self {
        self.intake_list = Some(list);
        self
    }

    /// Configures a delete zone drop target.
    #[must_use]
    pub fn with_delete_zone(mut self, zone: ListId) -> Self {
        self.delete_zone = Some(zone);
        self
    }

    /// Sets the sync event channel capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the layout used by file-backed stores.
    #[must_use]
    pub fn with_snapshot_layout(mut self, layout: SnapshotLayout) -> Self {
        self.snapshot_layout = layout;
        self
    }

    /// Returns the list receiving newly added tasks.
    #[must_use]
    pub fn intake_list(&self) -> Option<&ListId> {
        self.intake_list.as_ref().or_else(|| self.lists.first())
    }

    /// Returns `true` when `list` is the configured delete zone.
    #[must_use]
    pub fn is_delete_zone(&self, list: &ListId) -> bool {
        self.delete_zone.as_ref() == Some(list)
    }

    /// Checks the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`BoardConfigError`] found.
    pub fn validate(&self) -> Result<(), BoardConfigError> {
        if self.lists.is_empty() {
            return Err(BoardConfigError::NoLists);
        }
        let mut seen = HashSet::new();
        for list in &self.lists {
            if !seen.insert(list) {
                return Err(BoardConfigError::DuplicateList(list.clone()));
            }
        }
        if let Some(intake) = &self.intake_list {
            if !seen.contains(intake) {
                return Err(BoardConfigError::UnknownIntakeList(intake.clone()));
            }
        }
        if let Some(zone) = &self.delete_zone {
            if seen.contains(zone) {
                return Err(BoardConfigError::DeleteZoneIsList(zone.clone()));
            }
        }
        if self.event_capacity == 0 {
            return Err(BoardConfigError::ZeroEventCapacity);
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`BoardConfigError::Parse`] for malformed JSON or unknown
    /// fields, or a validation error.
    pub fn from_json_str(raw: &str) -> Result<Self, BoardConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`BoardConfigError::Io`] when the file cannot be read, or any
    /// error from [`from_json_str`](Self::from_json_str).
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, BoardConfigError> {
        let file_name = path.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "configuration path must include a file name",
            )
        })?;
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
        let raw = dir.read_to_string(file_name)?;
        Self::from_json_str(&raw)
    }
}
