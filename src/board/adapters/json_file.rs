//! JSON document store backed by a single file in a capability-scoped
//! directory.

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io;
use std::sync::Arc;

use crate::board::{
    domain::{BoardSnapshot, SnapshotLayout, snapshot},
    ports::{SnapshotStore, SnapshotStoreError, SnapshotStoreResult},
};
use crate::config::BoardConfig;

/// Default document name inside the store directory.
pub const DEFAULT_FILE_NAME: &str = "board.json";

/// Snapshot store writing one JSON document per board.
///
/// Saves go to a temporary sibling first and are renamed over the document,
/// so a crash mid-write leaves the previous snapshot intact. Loads accept
/// every layout and schema version understood by [`snapshot::decode`].
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    dir: Arc<Dir>,
    file_name: String,
    layout: SnapshotLayout,
}

impl JsonFileSnapshotStore {
    /// Opens a store over an existing directory.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::Persistence`] if the directory cannot be
    /// opened.
    pub fn open(directory: &Utf8Path) -> SnapshotStoreResult<Self> {
        let dir = Dir::open_ambient_dir(directory, ambient_authority())
            .map_err(SnapshotStoreError::persistence)?;
        Ok(Self::from_dir(dir))
    }

    /// Opens a store over an existing directory, saving in the layout named
    /// by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotStoreError::Persistence`] if the directory cannot be
    /// opened.
    pub fn from_config(directory: &Utf8Path, config: &BoardConfig) -> SnapshotStoreResult<Self> {
        Ok(Self::open(directory)?.with_layout(config.snapshot_layout))
    }

    /// Wraps an already opened directory.
    #[must_use]
    pub fn from_dir(dir: Dir) -> Self {
        Self {
            dir: Arc::new(dir),
            file_name: DEFAULT_FILE_NAME.to_owned(),
            layout: SnapshotLayout::default(),
        }
    }

    /// Sets the document name.
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Sets the layout used when saving.
    #[must_use]
    pub const fn with_layout(mut self, layout: SnapshotLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Returns the document name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Returns the layout used when saving.
    #[must_use]
    pub const fn layout(&self) -> SnapshotLayout {
        self.layout
    }

    fn temp_name(&self) -> String {
        format!(".{}.tmp", self.file_name)
    }
}

async fn run_blocking<T, F>(operation: F) -> SnapshotStoreResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> SnapshotStoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|err| SnapshotStoreError::persistence(io::Error::other(err.to_string())))?
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn load_snapshot(&self) -> SnapshotStoreResult<Option<BoardSnapshot>> {
        let dir = Arc::clone(&self.dir);
        let file_name = self.file_name.clone();
        let bytes = run_blocking(move || match dir.read(&file_name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SnapshotStoreError::persistence(err)),
        })
        .await?;

        bytes
            .map(|raw| snapshot::decode(&raw).map_err(SnapshotStoreError::from))
            .transpose()
    }

    async fn save_snapshot(&self, snapshot: &BoardSnapshot) -> SnapshotStoreResult<()> {
        let bytes = snapshot::encode(snapshot, self.layout)?;
        let dir = Arc::clone(&self.dir);
        let file_name = self.file_name.clone();
        let temp_name = self.temp_name();
        run_blocking(move || {
            dir.write(&temp_name, &bytes)
                .map_err(SnapshotStoreError::persistence)?;
            dir.rename(&temp_name, &dir, &file_name)
                .map_err(SnapshotStoreError::persistence)
        })
        .await
    }
}
