//! [`Document`] implementation for persisted carts.
//!
//! A [`StoredCart`] is keyed by user and guarded by its [`Version`]: every write or
//! delete must carry a newer version than the one stored, or it is reported as
//! [`WriteOutcome::Stale`] and ignored. Deletes keep the entry as an empty tombstone
//! so their version keeps blocking older saves.

use super::CartRecordError;
use crate::cart::{CartDocument, WriteOutcome};
use crate::framework::Document;
use crate::model::{CartLine, UserId, Version};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// A user's persisted cart, or the tombstone left by deleting it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCart {
    pub user: UserId,
    pub version: Version,
    pub lines: Vec<CartLine>,
    pub updated_at: DateTime<Utc>,
}

impl StoredCart {
    pub fn to_document(&self) -> CartDocument {
        CartDocument {
            lines: self.lines.clone(),
            version: self.version,
            updated_at: self.updated_at,
        }
    }

    fn tombstone(user: UserId, version: Version) -> Self {
        Self {
            user,
            version,
            lines: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

fn validate(document: &CartDocument) -> Result<(), CartRecordError> {
    let mut seen = HashSet::new();
    for line in &document.lines {
        if line.quantity == 0 {
            return Err(CartRecordError::ZeroQuantity(line.product_id.clone()));
        }
        if !seen.insert(&line.product_id) {
            return Err(CartRecordError::DuplicateLine(line.product_id.clone()));
        }
    }
    Ok(())
}

#[async_trait]
impl Document for StoredCart {
    type Key = UserId;
    type Put = CartDocument;
    type Delete = Version;
    type Outcome = WriteOutcome;
    type Context = ();
    type Error = CartRecordError;

    fn from_put(user: UserId, document: CartDocument) -> Result<(Self, WriteOutcome), CartRecordError> {
        validate(&document)?;
        let cart = Self {
            user,
            version: document.version,
            lines: document.lines,
            updated_at: document.updated_at,
        };
        Ok((cart, WriteOutcome::Applied))
    }

    fn from_delete(user: UserId, version: Version) -> (Self, WriteOutcome) {
        (Self::tombstone(user, version), WriteOutcome::Applied)
    }

    async fn on_put(&mut self, document: CartDocument, _ctx: &()) -> Result<WriteOutcome, CartRecordError> {
        validate(&document)?;
        if document.version <= self.version {
            return Ok(WriteOutcome::Stale {
                current: self.version,
            });
        }
        self.version = document.version;
        self.lines = document.lines;
        self.updated_at = document.updated_at;
        Ok(WriteOutcome::Applied)
    }

    async fn on_delete(&mut self, version: Version, _ctx: &()) -> Result<WriteOutcome, CartRecordError> {
        if version <= self.version {
            return Ok(WriteOutcome::Stale {
                current: self.version,
            });
        }
        *self = Self::tombstone(self.user.clone(), version);
        Ok(WriteOutcome::Applied)
    }

    /// Empty carts and tombstones read as missing.
    fn is_live(&self) -> bool {
        !self.lines.is_empty()
    }
}
