//! Cart storage backed by one JSON file per user.

use super::{CartDocument, CartStorage, StorageError, WriteOutcome};
use crate::model::{UserId, Version};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Stores each cart as `<dir>/<hex(user id)>.json`.
///
/// A delete rewrites the file as an empty document carrying the delete's version, which
/// is the tombstone later saves are compared against. Files are replaced through a
/// temporary file and a rename, so a reader never sees a partial write.
pub struct JsonFileCartStorage {
    dir: PathBuf,
    // Serializes read-compare-write sequences.
    write_lock: Mutex<()>,
}

impl JsonFileCartStorage {
    /// Opens (and creates if needed) the storage directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user: &UserId) -> PathBuf {
        // Hex keeps arbitrary identity-provider ids filesystem safe.
        let mut name = String::with_capacity(user.as_str().len() * 2 + 5);
        for byte in user.as_str().bytes() {
            let _ = write!(name, "{byte:02x}");
        }
        name.push_str(".json");
        self.dir.join(name)
    }

    async fn read(&self, user: &UserId) -> Result<Option<CartDocument>, StorageError> {
        match tokio::fs::read(self.path_for(user)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, user: &UserId, document: &CartDocument) -> Result<(), StorageError> {
        let path = self.path_for(user);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn stored_version(&self, user: &UserId) -> Result<Option<Version>, StorageError> {
        Ok(self.read(user).await?.map(|doc| doc.version))
    }
}

#[async_trait]
impl CartStorage for JsonFileCartStorage {
    #[instrument(skip(self))]
    async fn load(&self, user: &UserId) -> Result<Option<CartDocument>, StorageError> {
        let document = self.read(user).await?.filter(|doc| !doc.lines.is_empty());
        debug!(found = document.is_some(), "Load");
        Ok(document)
    }

    #[instrument(skip(self, document), fields(version = %document.version))]
    async fn save(&self, user: &UserId, document: CartDocument) -> Result<WriteOutcome, StorageError> {
        let _guard = self.write_lock.lock().await;
        if let Some(current) = self.stored_version(user).await? {
            if document.version <= current {
                debug!(%current, "Save is stale");
                return Ok(WriteOutcome::Stale { current });
            }
        }
        self.write(user, &document).await?;
        debug!(lines = document.lines.len(), "Saved");
        Ok(WriteOutcome::Applied)
    }

    #[instrument(skip(self))]
    async fn delete(&self, user: &UserId, version: Version) -> Result<WriteOutcome, StorageError> {
        let _guard = self.write_lock.lock().await;
        if let Some(current) = self.stored_version(user).await? {
            if version <= current {
                debug!(%current, "Delete is stale");
                return Ok(WriteOutcome::Stale { current });
            }
        }
        self.write(user, &CartDocument::new(Vec::new(), version)).await?;
        debug!("Deleted");
        Ok(WriteOutcome::Applied)
    }
}
