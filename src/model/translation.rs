use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{Locale, ProductId};

/// Identifier of a `product_translations` row. Ordered, so that ambiguous lookups can
/// pick deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationId(pub u64);

impl From<u64> for TranslationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl Display for TranslationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "translation_{}", self.0)
    }
}

/// Localized name and description for one product family member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub id: TranslationId,
    pub lang: Locale,
    pub name: String,
    pub description: Option<String>,
}

impl Translation {
    pub fn new(id: impl Into<TranslationId>, lang: Locale, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lang,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Row of the `products_product_translations` join table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mapping {
    pub product_id: ProductId,
    pub translation_id: TranslationId,
}

impl Mapping {
    pub fn new(product_id: impl Into<ProductId>, translation_id: impl Into<TranslationId>) -> Self {
        Self {
            product_id: product_id.into(),
            translation_id: translation_id.into(),
        }
    }
}
