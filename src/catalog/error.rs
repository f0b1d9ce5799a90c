//! Error types for the catalog database.

use thiserror::Error;

/// Errors raised by a [`CatalogSource`](super::CatalogSource).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    /// The catalog could not be reached (network, connection pool, ...).
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// The catalog answered but the query failed.
    #[error("Catalog query failed: {0}")]
    Query(String),
}
