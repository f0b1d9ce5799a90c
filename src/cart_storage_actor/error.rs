//! Error types for the stored cart entity.

use crate::model::ProductId;
use thiserror::Error;

/// A cart document that cannot be stored.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartRecordError {
    /// Stored lines must have a strictly positive quantity.
    #[error("Zero quantity for product: {0}")]
    ZeroQuantity(ProductId),

    /// Each product may appear once per cart.
    #[error("Duplicate line for product: {0}")]
    DuplicateLine(ProductId),
}
