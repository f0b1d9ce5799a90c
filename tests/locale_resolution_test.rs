mod common;

use async_trait::async_trait;
use catalog_sync::catalog::{CatalogError, CatalogSource, InMemoryCatalog, ProductOrder, ProductQuery};
use catalog_sync::locale::{compute_variant_slug, IntegrityAnomaly, LocaleResolver, ResolveError, Variant};
use catalog_sync::model::{Locale, Mapping, Product, ProductId, Translation, TranslationId};
use common::seeded_catalog;
use std::sync::Arc;

/// Delegates to an in-memory catalog but fails every translation lookup.
struct TranslationsDown(Arc<InMemoryCatalog>);

#[async_trait]
impl CatalogSource for TranslationsDown {
    async fn product_by_id(&self, id: &ProductId) -> Result<Option<Product>, CatalogError> {
        self.0.product_by_id(id).await
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError> {
        self.0.product_by_slug(slug).await
    }

    async fn products_in(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError> {
        self.0.products_in(ids).await
    }

    async fn mappings_for_products(&self, ids: &[ProductId]) -> Result<Vec<Mapping>, CatalogError> {
        self.0.mappings_for_products(ids).await
    }

    async fn mappings_for_translations(&self, ids: &[TranslationId]) -> Result<Vec<Mapping>, CatalogError> {
        self.0.mappings_for_translations(ids).await
    }

    async fn translations_in(
        &self,
        _ids: &[TranslationId],
        _lang: Option<Locale>,
    ) -> Result<Vec<Translation>, CatalogError> {
        Err(CatalogError::Unavailable("translation table locked".into()))
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, CatalogError> {
        self.0.list_products(query).await
    }
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let resolver = LocaleResolver::new(seeded_catalog().await);

    let first = resolver.resolve("dragon-deck-en", Locale::Fr).await.unwrap().unwrap();
    let second = resolver.resolve("dragon-deck-en", Locale::Fr).await.unwrap().unwrap();

    assert_eq!(first.view, second.view);
    assert_eq!(first.view.name, "Deck du Dragon");
    assert_eq!(first.view.description.as_deref(), Some("Soixante cartes"));
    assert_eq!(first.view.price, second.view.price);
}

#[tokio::test]
async fn test_id_slug_and_bare_slug_resolve_to_the_same_product() {
    let resolver = LocaleResolver::new(seeded_catalog().await);

    let by_id = resolver.resolve("p2", Locale::Jp).await.unwrap().unwrap();
    let by_slug = resolver.resolve("dragon-deck-jp", Locale::Jp).await.unwrap().unwrap();
    let by_bare = resolver.resolve("dragon-deck", Locale::Jp).await.unwrap().unwrap();

    assert_eq!(by_id.view.id, ProductId::from("p2"));
    assert_eq!(by_slug.view, by_id.view);
    assert_eq!(by_bare.view, by_id.view);
    assert_eq!(by_id.view.name, "ドラゴンデッキ");
}

#[tokio::test]
async fn test_unknown_identifier_is_not_found() {
    let resolver = LocaleResolver::new(seeded_catalog().await);

    assert!(resolver.resolve("unicorn-deck", Locale::En).await.unwrap().is_none());
    assert!(resolver.resolve("   ", Locale::En).await.unwrap().is_none());
}

#[tokio::test]
async fn test_translation_failure_falls_back_to_base_fields() {
    let resolver = LocaleResolver::new(Arc::new(TranslationsDown(seeded_catalog().await)));

    let resolved = resolver.resolve("p1", Locale::Fr).await.unwrap().unwrap();
    assert_eq!(resolved.view.name, "Dragon Deck");
    assert!(!resolved.view.is_translated());
}

#[tokio::test]
async fn test_base_lookup_failure_propagates() {
    let catalog = seeded_catalog().await;
    catalog.set_offline(true);
    let resolver = LocaleResolver::new(catalog);

    let err = resolver.resolve("p1", Locale::Fr).await.unwrap_err();
    assert!(matches!(err, ResolveError::Catalog(CatalogError::Unavailable(_))));
}

#[tokio::test]
async fn test_duplicate_translations_pick_lowest_id_and_are_reported() {
    let catalog = seeded_catalog().await;
    catalog
        .insert_translation(Translation::new(9, Locale::Fr, "Le Dragon (doublon)"))
        .await;
    catalog.link("p1", 9).await;
    let resolver = LocaleResolver::new(catalog);

    let resolved = resolver.resolve("p1", Locale::Fr).await.unwrap().unwrap();
    assert_eq!(resolved.view.name, "Deck du Dragon");
    assert_eq!(
        resolved.anomalies,
        vec![IntegrityAnomaly::DuplicateTranslation {
            product_id: ProductId::from("p1"),
            lang: Locale::Fr,
            translation_ids: vec![TranslationId(2), TranslationId(9)],
        }]
    );
    assert_eq!(resolver.anomaly_count(), 1);
}

#[tokio::test]
async fn test_list_variants_covers_the_family() {
    let resolver = LocaleResolver::new(seeded_catalog().await);

    let variants = resolver
        .list_variants(&ProductId::from("p1"), Locale::En, &[])
        .await
        .unwrap();

    assert_eq!(
        variants,
        vec![
            Variant {
                locale: Locale::Es,
                slug: "dragon-deck-es".into(),
                name: "Mazo del Dragón".into(),
            },
            Variant {
                locale: Locale::Fr,
                slug: "dragon-deck-fr".into(),
                name: "Deck du Dragon".into(),
            },
            Variant {
                locale: Locale::Jp,
                slug: "dragon-deck-jp".into(),
                name: "ドラゴンデッキ".into(),
            },
        ]
    );
}

#[tokio::test]
async fn test_list_variants_excludes_current_locale_and_given_ids() {
    let resolver = LocaleResolver::new(seeded_catalog().await);

    let variants = resolver
        .list_variants(&ProductId::from("p2"), Locale::Jp, &[TranslationId(4)])
        .await
        .unwrap();

    let locales: Vec<Locale> = variants.iter().map(|v| v.locale).collect();
    assert_eq!(locales, vec![Locale::En, Locale::Fr]);
    assert!(variants.iter().all(|v| v.locale != Locale::Jp));
}

#[tokio::test]
async fn test_list_variants_of_a_lone_product_is_empty() {
    let resolver = LocaleResolver::new(seeded_catalog().await);

    let variants = resolver
        .list_variants(&ProductId::from("p4"), Locale::En, &[])
        .await
        .unwrap();
    assert!(variants.is_empty());

    let missing = resolver
        .list_variants(&ProductId::from("nope"), Locale::En, &[])
        .await
        .unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn test_list_translates_a_page_in_order() {
    let resolver = LocaleResolver::new(seeded_catalog().await);

    let query = ProductQuery::new()
        .category("decks")
        .order_by(ProductOrder::PriceAscending)
        .page(2, 0);
    let page = resolver.list(&query, Locale::Fr).await.unwrap();

    let names: Vec<&str> = page.iter().map(|r| r.view.name.as_str()).collect();
    // p3 (20.00) has no French translation, p1 (25.00) does.
    assert_eq!(names, vec!["Phoenix Deck", "Deck du Dragon"]);

    let next = resolver.list(&query.clone().page(2, 2), Locale::Fr).await.unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].view.id, ProductId::from("p2"));
    assert_eq!(next[0].view.name, "Deck du Dragon");
}

#[test]
fn test_compute_variant_slug_edge_cases() {
    assert_eq!(compute_variant_slug(Some("dragon-deck-en"), Locale::Fr, None), "dragon-deck-fr");
    assert_eq!(compute_variant_slug(Some("dragon-deck"), Locale::Es, None), "dragon-deck-es");
    assert_eq!(compute_variant_slug(None, Locale::De, Some("p9")), "p9-de");
    assert_eq!(compute_variant_slug(Some(""), Locale::De, None), "product-de");
    // Suffix replacement is idempotent.
    let once = compute_variant_slug(Some("deck-2024"), Locale::Jp, None);
    assert_eq!(once, "deck-2024-jp");
    assert_eq!(compute_variant_slug(Some(&once), Locale::Jp, None), once);
}
