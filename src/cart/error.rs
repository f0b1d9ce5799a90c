//! Error types for durable cart storage.

use thiserror::Error;

/// Errors raised by a [`CartStorage`](super::CartStorage) backend.
///
/// The synchronizer logs these and carries on; they never reach cart callers.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage backend (actor, service, ...) failed or is unreachable.
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored cart could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}
