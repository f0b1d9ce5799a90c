//! Error types for the locale resolver.

use crate::catalog::CatalogError;
use thiserror::Error;

/// Errors that can occur while resolving a product.
///
/// A product that does not exist is not an error (`Ok(None)`), and neither is a
/// missing translation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolveError {
    /// The base product lookup failed.
    #[error("Catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),
}
