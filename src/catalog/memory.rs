//! In-process catalog used by the demo binary and the tests.

use super::{CatalogError, CatalogSource, ProductOrder, ProductQuery};
use crate::live::{FeedError, UpdateFeed};
use crate::model::{Locale, Mapping, Product, ProductId, ProductUpdate, Translation, TranslationId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    translations: BTreeMap<TranslationId, Translation>,
    mappings: Vec<Mapping>,
}

/// A catalog held in memory behind a `RwLock`.
///
/// It plays both external roles: the catalog database ([`CatalogSource`]) and the
/// lightweight price/stock endpoint ([`UpdateFeed`]). [`InMemoryCatalog::apply_update`]
/// stands in for the external catalog management process mutating live fields.
#[derive(Default)]
pub struct InMemoryCatalog {
    tables: RwLock<Tables>,
    offline: AtomicBool,
    feed_fetches: AtomicU64,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        let mut tables = self.tables.write().await;
        tables.products.insert(product.id.clone(), product);
    }

    pub async fn insert_translation(&self, translation: Translation) {
        let mut tables = self.tables.write().await;
        tables.translations.insert(translation.id, translation);
    }

    /// Adds a mapping row. Duplicate rows are ignored.
    pub async fn link(&self, product_id: impl Into<ProductId>, translation_id: impl Into<TranslationId>) {
        let mapping = Mapping::new(product_id, translation_id);
        let mut tables = self.tables.write().await;
        if !tables.mappings.contains(&mapping) {
            tables.mappings.push(mapping);
        }
    }

    /// Mutates the live fields of a product. Returns `false` for an unknown id.
    pub async fn apply_update(&self, update: &ProductUpdate) -> bool {
        let mut tables = self.tables.write().await;
        let Some(product) = tables.products.get_mut(&update.id) else {
            return false;
        };
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(discount) = update.discount {
            product.discount = Some(discount);
        }
        if let Some(in_stock) = update.in_stock {
            product.in_stock = in_stock;
        }
        product.updated_at = Utc::now();
        debug!(product_id = %update.id, "Catalog updated");
        true
    }

    /// While offline every query and feed fetch fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of feed fetches served (failed ones included).
    pub fn feed_fetches(&self) -> u64 {
        self.feed_fetches.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), CatalogError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("catalog is offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn product_by_id(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        self.check_online()?;
        Ok(self.tables.read().await.products.get(id).cloned())
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        // Slugs are not constrained unique; the lowest id wins.
        Ok(tables
            .products
            .values()
            .filter(|p| p.slug == slug)
            .min_by(|a, b| a.id.cmp(&b.id))
            .cloned())
    }

    async fn products_in(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.products.get(id).cloned()).collect())
    }

    async fn mappings_for_products(&self, ids: &[ProductId]) -> Result<Vec<Mapping>, CatalogError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .mappings
            .iter()
            .filter(|m| ids.contains(&m.product_id))
            .cloned()
            .collect())
    }

    async fn mappings_for_translations(
        &self,
        ids: &[TranslationId],
    ) -> Result<Vec<Mapping>, CatalogError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .mappings
            .iter()
            .filter(|m| ids.contains(&m.translation_id))
            .cloned()
            .collect())
    }

    async fn translations_in(
        &self,
        ids: &[TranslationId],
        lang: Option<Locale>,
    ) -> Result<Vec<Translation>, CatalogError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .translations
            .values()
            .filter(|t| ids.contains(&t.id))
            .filter(|t| lang.map_or(true, |l| t.lang == l))
            .cloned()
            .collect())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        self.check_online()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Product> = tables
            .products
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();

        // Ties fall back to id so pages are stable.
        match query.order {
            ProductOrder::NewestFirst => {
                rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)))
            }
            ProductOrder::OldestFirst => {
                rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            }
            ProductOrder::PriceAscending => {
                rows.sort_by(|a, b| a.price.cmp(&b.price).then_with(|| a.id.cmp(&b.id)))
            }
            ProductOrder::PriceDescending => {
                rows.sort_by(|a, b| b.price.cmp(&a.price).then_with(|| a.id.cmp(&b.id)))
            }
            ProductOrder::Slug => rows.sort_by(|a, b| a.slug.cmp(&b.slug)),
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(query.offset).take(limit).collect())
    }
}

#[async_trait]
impl UpdateFeed for InMemoryCatalog {
    async fn fetch_updates(&self) -> Result<Vec<ProductUpdate>, FeedError> {
        self.feed_fetches.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(FeedError::Unavailable("catalog is offline".into()));
        }
        let tables = self.tables.read().await;
        Ok(tables.products.values().map(Product::live_fields).collect())
    }
}
