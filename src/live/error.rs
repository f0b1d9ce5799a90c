//! Error types for the update feed.

use thiserror::Error;

/// Failure of a single feed fetch. Never returned by the poller, only recorded in
/// [`PollerStatus`](super::PollerStatus).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeedError {
    /// The feed endpoint could not be reached.
    #[error("Update feed unavailable: {0}")]
    Unavailable(String),

    /// The feed answered with data that could not be used.
    #[error("Malformed update feed: {0}")]
    Malformed(String),
}
