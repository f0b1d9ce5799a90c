//! # Entity Store
//!
//! The read-only view of the catalog database this crate depends on. Three collections
//! are consulted: `products`, `product_translations` and the
//! `products_product_translations` mapping between them. The contract is deliberately
//! narrow: lookups by id and slug, `in(ids)` batches, and one filtered, ordered and
//! paginated listing query.

pub mod error;
pub mod memory;

pub use error::*;
pub use memory::*;

use crate::model::{Locale, Mapping, Product, ProductId, Translation, TranslationId};
use async_trait::async_trait;

/// Single-column ordering supported by [`CatalogSource::list_products`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    PriceAscending,
    PriceDescending,
    Slug,
}

/// Equality filters, one ordering column and limit/offset pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub order: ProductOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn order_by(mut self, order: ProductOrder) -> Self {
        self.order = order;
        self
    }

    pub fn page(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Whether `product` passes the equality filters.
    pub fn matches(&self, product: &Product) -> bool {
        self.category.as_deref().map_or(true, |c| product.category == c)
            && self.brand.as_deref().map_or(true, |b| product.brand == b)
    }
}

/// The catalog database contract.
///
/// Implementations must be cheap to share (`Arc<dyn CatalogSource>`) and safe to call
/// concurrently. Missing rows are `Ok(None)` or an empty `Vec`, never an error.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn product_by_id(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError>;

    /// `products where id in (ids)`. Unknown ids are skipped.
    async fn products_in(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError>;

    /// Mapping rows whose product id is in `ids`.
    async fn mappings_for_products(&self, ids: &[ProductId]) -> Result<Vec<Mapping>, CatalogError>;

    /// Mapping rows whose translation id is in `ids`.
    async fn mappings_for_translations(
        &self,
        ids: &[TranslationId],
    ) -> Result<Vec<Mapping>, CatalogError>;

    /// `product_translations where id in (ids)`, optionally restricted to one language.
    async fn translations_in(
        &self,
        ids: &[TranslationId],
        lang: Option<Locale>,
    ) -> Result<Vec<Translation>, CatalogError>;

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError>;
}
