use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::memory::SnapshotIndex;
use super::{DomainObjectSnapshot, SnapshotResult, SnapshotStore};
use crate::{SnapshotStoreError, Version};

/// Embedded, file-backed snapshot store.
///
/// Snapshots are appended as JSON lines to a single data file and synced to
/// disk before `save_snapshots` returns. The file is read once on open and
/// served from an in-memory index afterwards; a later line for the same
/// `(data_type, identifier, object_version)` replaces an earlier one.
#[derive(Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
    index: Arc<RwLock<SnapshotIndex>>,
}

impl FileSnapshotStore {
    /// Opens the store at `path`, creating parent directories as needed.
    ///
    /// Fails if an existing data file contains a line that is not a valid
    /// snapshot record. A partial last line without a trailing newline is
    /// dropped and truncated away; a complete one is kept and terminated.
    pub async fn open(path: impl AsRef<Path>) -> SnapshotResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let mut index = SnapshotIndex::default();
        let mut torn_tail = 0;
        let mut unterminated = false;
        match fs::read_to_string(&path).await {
            Ok(contents) => {
                for (line_num, chunk) in contents.split_inclusive('\n').enumerate() {
                    let complete = chunk.ends_with('\n');
                    let line = chunk.trim_end_matches(['\n', '\r']);
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<DomainObjectSnapshot>(line) {
                        Ok(snapshot) => {
                            index.insert(snapshot);
                            unterminated = !complete;
                        }
                        // An interrupted append leaves a partial last line.
                        Err(e) if !complete => {
                            tracing::warn!(line = line_num + 1, error = %e, "discarding partial snapshot record");
                            torn_tail = chunk.len();
                        }
                        Err(e) => {
                            tracing::error!(line = line_num + 1, error = %e, "corrupt snapshot record");
                            return Err(SnapshotStoreError::Serialization(e));
                        }
                    }
                }

                if torn_tail > 0 {
                    let file = OpenOptions::new().write(true).open(&path).await?;
                    file.set_len((contents.len() - torn_tail) as u64).await?;
                    file.sync_all().await?;
                } else if unterminated {
                    let mut file = OpenOptions::new().append(true).open(&path).await?;
                    file.write_all(b"\n").await?;
                    file.sync_all().await?;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(path = %path.display(), snapshots = index.len(), "opened snapshot file");
        Ok(Self {
            path,
            index: Arc::new(RwLock::new(index)),
        })
    }

    /// Returns the path of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save_snapshots(&self, snapshots: Vec<DomainObjectSnapshot>) -> SnapshotResult<()> {
        if snapshots.is_empty() {
            return Ok(());
        }

        let mut buffer = String::new();
        for snapshot in &snapshots {
            buffer.push_str(&serde_json::to_string(snapshot)?);
            buffer.push('\n');
        }

        // File and index are updated under the same lock.
        let mut index = self.index.write().await;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buffer.as_bytes()).await?;
        file.sync_all().await?;

        for snapshot in snapshots {
            index.insert(snapshot);
        }
        Ok(())
    }

    async fn get_snapshot(
        &self,
        data_type: &str,
        identifier: &str,
    ) -> SnapshotResult<Option<DomainObjectSnapshot>> {
        Ok(self.index.read().await.latest(data_type, identifier))
    }

    async fn get_snapshot_at(
        &self,
        data_type: &str,
        identifier: &str,
        max_version: Version,
    ) -> SnapshotResult<Option<DomainObjectSnapshot>> {
        Ok(self
            .index
            .read()
            .await
            .at_or_below(data_type, identifier, max_version))
    }

    async fn get_latest_snapshot_numbers(&self) -> SnapshotResult<i64> {
        Ok(self.index.read().await.highest_version())
    }
}
