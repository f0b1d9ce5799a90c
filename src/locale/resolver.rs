use super::{compute_variant_slug, locale_suffix, ResolveError};
use crate::catalog::{CatalogSource, ProductQuery};
use crate::model::{Locale, Mapping, Product, ProductId, ProductView, Translation, TranslationId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Catalog data that violates the one-translation-per-locale rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityAnomaly {
    /// `product_id` maps to several translations in `lang`. The first id was used.
    DuplicateTranslation {
        product_id: ProductId,
        lang: Locale,
        translation_ids: Vec<TranslationId>,
    },
}

/// Result of a successful [`LocaleResolver::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProduct {
    pub view: Arc<ProductView>,
    /// Data errors noticed (and worked around) while resolving.
    pub anomalies: Vec<IntegrityAnomaly>,
}

/// A sibling of a product in another locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub locale: Locale,
    pub slug: String,
    pub name: String,
}

/// Resolves products against the catalog for a given locale.
///
/// # Resolution
/// 1. Look the identifier up as a product id, then as a slug. A bare slug (no locale
///    suffix) that misses is retried with the requested locale appended.
/// 2. Collect the translations mapped to the product in the requested locale.
/// 3. Overlay the first one (lowest id) on the base record. No translation, or a
///    failure fetching translations, leaves the base name and description in place.
///
/// Several translations in one locale are a data error. The lowest id wins so results
/// stay deterministic, and the anomaly is logged, counted and returned to the caller.
pub struct LocaleResolver {
    catalog: Arc<dyn CatalogSource>,
    anomalies: AtomicU64,
}

impl LocaleResolver {
    pub fn new(catalog: Arc<dyn CatalogSource>) -> Self {
        Self {
            catalog,
            anomalies: AtomicU64::new(0),
        }
    }

    /// Number of integrity anomalies seen since construction.
    pub fn anomaly_count(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    /// Resolves `identifier` (product id, suffixed slug or bare slug) for `locale`.
    ///
    /// Returns `Ok(None)` when nothing matches.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        identifier: &str,
        locale: Locale,
    ) -> Result<Option<ResolvedProduct>, ResolveError> {
        let Some(product) = self.find_base(identifier, locale).await? else {
            debug!("Not found");
            return Ok(None);
        };

        let candidates = match self.translations_for(&[product.id.clone()], locale).await {
            Ok(translations) => translations,
            Err(e) => {
                warn!(product_id = %product.id, error = %e, "Translation lookup failed, using base fields");
                Vec::new()
            }
        };

        Ok(Some(self.overlay(&product, locale, candidates)))
    }

    /// Resolves a page of products with one mapping query and one translation query.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ProductQuery,
        locale: Locale,
    ) -> Result<Vec<ResolvedProduct>, ResolveError> {
        let products = self.catalog.list_products(query).await?;
        let ids: Vec<ProductId> = products.iter().map(|p| p.id.clone()).collect();

        let (mappings, translations) = match self.mapped_translations(&ids, Some(locale)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Translation lookup failed, using base fields");
                (Vec::new(), Vec::new())
            }
        };

        let by_id: HashMap<TranslationId, &Translation> =
            translations.iter().map(|t| (t.id, t)).collect();

        Ok(products
            .iter()
            .map(|product| {
                let candidates = mappings
                    .iter()
                    .filter(|m| m.product_id == product.id)
                    .filter_map(|m| by_id.get(&m.translation_id).map(|t| (*t).clone()))
                    .collect();
                self.overlay(product, locale, candidates)
            })
            .collect())
    }

    /// Lists the locales `product_id` is available in besides `current`.
    ///
    /// The variant family is every product sharing a translation with `product_id`.
    /// One entry per locale is returned (lowest translation id wins), ordered by locale.
    /// The slug is the family member's own slug for that locale when one exists, and a
    /// derived one otherwise.
    #[instrument(skip(self))]
    pub async fn list_variants(
        &self,
        product_id: &ProductId,
        current: Locale,
        exclude: &[TranslationId],
    ) -> Result<Vec<Variant>, ResolveError> {
        let Some(product) = self.catalog.product_by_id(product_id).await? else {
            return Ok(Vec::new());
        };

        let own = self
            .catalog
            .mappings_for_products(std::slice::from_ref(product_id))
            .await?;
        let own_ids: Vec<TranslationId> = own.iter().map(|m| m.translation_id).collect();

        let mut family: Vec<ProductId> = self
            .catalog
            .mappings_for_translations(&own_ids)
            .await?
            .into_iter()
            .map(|m| m.product_id)
            .collect();
        family.push(product_id.clone());
        dedup(&mut family);

        let (_, translations) = self.mapped_translations(&family, None).await?;
        let siblings = self.catalog.products_in(&family).await?;

        let mut by_locale: BTreeMap<Locale, Translation> = BTreeMap::new();
        for translation in translations {
            if translation.lang == current || exclude.contains(&translation.id) {
                continue;
            }
            by_locale
                .entry(translation.lang)
                .and_modify(|kept| {
                    if translation.id < kept.id {
                        *kept = translation.clone();
                    }
                })
                .or_insert(translation);
        }

        Ok(by_locale
            .into_values()
            .map(|translation| {
                let slug = siblings
                    .iter()
                    .find(|p| locale_suffix(&p.slug) == Some(translation.lang))
                    .map(|p| p.slug.clone())
                    .unwrap_or_else(|| {
                        compute_variant_slug(Some(&product.slug), translation.lang, Some(product.id.as_str()))
                    });
                Variant {
                    locale: translation.lang,
                    slug,
                    name: translation.name,
                }
            })
            .collect())
    }

    async fn find_base(&self, identifier: &str, locale: Locale) -> Result<Option<Product>, ResolveError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(None);
        }
        if let Some(product) = self.catalog.product_by_id(&ProductId::from(identifier)).await? {
            return Ok(Some(product));
        }
        if let Some(product) = self.catalog.product_by_slug(identifier).await? {
            return Ok(Some(product));
        }
        if locale_suffix(identifier).is_none() {
            let suffixed = compute_variant_slug(Some(identifier), locale, None);
            return Ok(self.catalog.product_by_slug(&suffixed).await?);
        }
        Ok(None)
    }

    async fn translations_for(
        &self,
        ids: &[ProductId],
        locale: Locale,
    ) -> Result<Vec<Translation>, ResolveError> {
        let (_, translations) = self.mapped_translations(ids, Some(locale)).await?;
        Ok(translations)
    }

    /// Mapping rows of `ids` plus the translations they point at.
    async fn mapped_translations(
        &self,
        ids: &[ProductId],
        lang: Option<Locale>,
    ) -> Result<(Vec<Mapping>, Vec<Translation>), ResolveError> {
        if ids.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        let mappings = self.catalog.mappings_for_products(ids).await?;
        let mut translation_ids: Vec<TranslationId> =
            mappings.iter().map(|m| m.translation_id).collect();
        dedup(&mut translation_ids);
        if translation_ids.is_empty() {
            return Ok((mappings, Vec::new()));
        }
        let translations = self.catalog.translations_in(&translation_ids, lang).await?;
        Ok((mappings, translations))
    }

    fn overlay(&self, product: &Product, locale: Locale, mut candidates: Vec<Translation>) -> ResolvedProduct {
        candidates.retain(|t| t.lang == locale);
        candidates.sort_by_key(|t| t.id);
        candidates.dedup_by_key(|t| t.id);

        let mut anomalies = Vec::new();
        if candidates.len() > 1 {
            let anomaly = IntegrityAnomaly::DuplicateTranslation {
                product_id: product.id.clone(),
                lang: locale,
                translation_ids: candidates.iter().map(|t| t.id).collect(),
            };
            self.anomalies.fetch_add(1, Ordering::Relaxed);
            warn!(product_id = %product.id, %locale, ?anomaly, "Duplicate translations, using lowest id");
            anomalies.push(anomaly);
        }

        let mut view = ProductView::from_base(product, locale);
        if let Some(translation) = candidates.into_iter().next() {
            view.translation_id = Some(translation.id);
            view.name = translation.name;
            if translation.description.is_some() {
                view.description = translation.description;
            }
        }

        ResolvedProduct {
            view: Arc::new(view),
            anomalies,
        }
    }
}

fn dedup<T: Eq + std::hash::Hash + Clone>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
