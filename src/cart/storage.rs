//! Durable per-user cart storage contract.

use super::StorageError;
use crate::model::{CartLine, UserId, Version};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a versioned write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOutcome {
    Applied,
    /// Storage already holds a write (or delete) at `current`, which is not older.
    Stale { current: Version },
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

/// The persisted cart of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDocument {
    pub lines: Vec<CartLine>,
    /// Version of the cart mutation this document captures.
    pub version: Version,
    pub updated_at: DateTime<Utc>,
}

impl CartDocument {
    pub fn new(lines: Vec<CartLine>, version: Version) -> Self {
        Self {
            lines,
            version,
            updated_at: Utc::now(),
        }
    }
}

/// Durable storage keyed by user, with last-write-wins by [`Version`].
///
/// # Contract
/// - `save` applies only if `document.version` is newer than the stored version,
///   including the version of a previous delete.
/// - `delete` applies only if `version` is newer, and leaves a tombstone so a save
///   issued before it can never bring the cart back.
/// - `load` returns `None` for a missing cart, a tombstone, or an empty document.
#[async_trait]
pub trait CartStorage: Send + Sync {
    async fn load(&self, user: &UserId) -> Result<Option<CartDocument>, StorageError>;

    async fn save(&self, user: &UserId, document: CartDocument) -> Result<WriteOutcome, StorageError>;

    async fn delete(&self, user: &UserId, version: Version) -> Result<WriteOutcome, StorageError>;
}
