//! Catalog product records and the views derived from them.
//!
//! # Data Flow
//! A [`Product`] is the base record owned by the catalog. The locale resolver overlays
//! a translation on it to produce a [`ProductView`], and the merge engine overlays the
//! latest [`ProductUpdate`] on that view before it is rendered.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{Locale, TranslationId};

/// Opaque, stable product identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base product record as stored in the `products` table.
///
/// Immutable from this crate's point of view except for `price`, `discount` and
/// `in_stock`, which the catalog mutates at any time and which reach us through the
/// live update feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Locale-suffixed slug, e.g. `dragon-deck-en`.
    pub slug: String,
    pub category: String,
    pub brand: String,
    /// Untranslated name, used when no translation exists for the requested locale.
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    /// Percentage between 0 and 100. `None` means no discount.
    pub discount: Option<Decimal>,
    pub in_stock: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with no discount, in stock, timestamped now.
    ///
    /// # Arguments
    /// * `id` - Stable identifier
    /// * `slug` - Locale-suffixed slug
    /// * `name` - Untranslated display name
    /// * `price` - Undiscounted price
    pub fn new(
        id: impl Into<ProductId>,
        slug: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            slug: slug.into(),
            category: String::new(),
            brand: String::new(),
            name: name.into(),
            description: None,
            price,
            discount: None,
            in_stock: true,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn with_stock(mut self, in_stock: bool) -> Self {
        self.in_stock = in_stock;
        self
    }

    /// Discount percentage with `None` read as zero.
    pub fn discount_percent(&self) -> Decimal {
        self.discount.unwrap_or(Decimal::ZERO)
    }

    /// The narrow projection of this record's mutable fields.
    pub fn live_fields(&self) -> ProductUpdate {
        ProductUpdate {
            id: self.id.clone(),
            price: Some(self.price),
            discount: Some(self.discount_percent()),
            in_stock: Some(self.in_stock),
        }
    }
}

/// Render-ready product: base fields plus the translation for one locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: ProductId,
    pub slug: String,
    /// Locale the view was resolved for.
    pub locale: Locale,
    /// Translation that supplied `name`/`description`, if any.
    pub translation_id: Option<TranslationId>,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub brand: String,
    pub price: Decimal,
    pub discount: Decimal,
    pub in_stock: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    /// Builds a view carrying the base record's own name and description.
    pub fn from_base(product: &Product, locale: Locale) -> Self {
        Self {
            id: product.id.clone(),
            slug: product.slug.clone(),
            locale,
            translation_id: None,
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            brand: product.brand.clone(),
            price: product.price,
            discount: product.discount_percent(),
            in_stock: product.in_stock,
            image: product.image.clone(),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }

    pub fn is_translated(&self) -> bool {
        self.translation_id.is_some()
    }
}

/// Live projection of a product's mutable fields.
///
/// A `None` field means "not delivered" and never overrides the base value, whereas
/// `Some(0)` or `Some(false)` do override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub id: ProductId,
    pub price: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub in_stock: Option<bool>,
}

impl ProductUpdate {
    /// An update for `id` that overrides nothing.
    pub fn empty(id: impl Into<ProductId>) -> Self {
        Self {
            id: id.into(),
            price: None,
            discount: None,
            in_stock: None,
        }
    }
}
