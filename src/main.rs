//! # Catalog Sync Demo
//!
//! Seeds an in-memory catalog and runs one storefront session:
//! 1. Resolve a product in several locales and list its variants.
//! 2. Fill a cart as a signed-in user and watch it persist.
//! 3. Change a price server-side and see the live overlay pick it up.
//! 4. Complete a payment and watch the cart clear everywhere.

use catalog_sync::catalog::InMemoryCatalog;
use catalog_sync::config::CatalogConfig;
use catalog_sync::lifecycle::{setup_tracing, CatalogSystem};
use catalog_sync::live::{display_price, RefreshOutcome};
use catalog_sync::model::{Locale, Product, ProductUpdate, Translation};
use clap::Parser;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, Instrument};

#[derive(Debug, Parser)]
#[command(name = "catalog-sync", about = "Catalog sync demo session", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: CatalogConfig,

    /// Locale the session browses in.
    #[arg(long, default_value_t = Locale::Fr)]
    locale: Locale,
}

async fn seed(catalog: &InMemoryCatalog) {
    catalog
        .insert_product(
            Product::new("p1", "dragon-deck-en", "Dragon Deck", Decimal::new(2499, 2))
                .with_category("decks")
                .with_brand("Wyrm Games"),
        )
        .await;
    catalog
        .insert_product(
            Product::new("p2", "dragon-deck-jp", "Dragon Deck (JP)", Decimal::new(2999, 2))
                .with_category("decks")
                .with_brand("Wyrm Games"),
        )
        .await;
    catalog
        .insert_product(
            Product::new("p3", "phoenix-deck-en", "Phoenix Deck", Decimal::new(1999, 2))
                .with_category("decks")
                .with_discount(Decimal::new(15, 0)),
        )
        .await;
    catalog
        .insert_product(Product::new("p4", "card-sleeves-en", "Card Sleeves", Decimal::new(599, 2)).with_category("accessories"))
        .await;

    catalog.insert_translation(Translation::new(1, Locale::En, "Dragon Deck")).await;
    catalog
        .insert_translation(Translation::new(2, Locale::Fr, "Deck du Dragon").with_description("Soixante cartes de dragons."))
        .await;
    catalog.insert_translation(Translation::new(3, Locale::Jp, "ドラゴンデッキ")).await;
    catalog.insert_translation(Translation::new(4, Locale::Fr, "Deck du Phénix")).await;
    for (product, translation) in [("p1", 1), ("p1", 2), ("p2", 3), ("p2", 2), ("p3", 4)] {
        catalog.link(product, translation).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();
    let cli = Cli::parse();
    let locale = cli.locale;

    let catalog = Arc::new(InMemoryCatalog::new());
    seed(&catalog).await;

    let system = CatalogSystem::start(cli.config, catalog.clone(), catalog.clone()).await?;
    system.sign_in("alice");
    system.sync().wait_ready().await?;

    // 1. Browse
    let span = tracing::info_span!("browse", %locale);
    async {
        for identifier in ["dragon-deck-en", "p3", "missing-deck"] {
            match system.product(identifier, locale).await? {
                Some(view) => {
                    info!(identifier, name = %view.name, price = %display_price(&view), "Product");
                    for variant in system.variants(&view.id, locale).await? {
                        info!(locale = %variant.locale, slug = %variant.slug, name = %variant.name, "Variant");
                    }
                }
                None => info!(identifier, "Product not found"),
            }
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    }
    .instrument(span)
    .await?;

    // 2. Fill the cart
    system.cart().add("p1", 2);
    system.cart().add("p3", 1);
    system.cart().add("p4", 1);
    system.cart().add("p4", -1);
    system.sync().flush().await?;
    info!(items = system.cart().total_items(), status = ?system.sync().status(), "Cart persisted");

    // 3. Price drop on the server
    let mut update = ProductUpdate::empty("p1");
    update.discount = Some(Decimal::new(20, 0));
    catalog.apply_update(&update).await;
    if let RefreshOutcome::Applied { products } = system.poller().refresh().await {
        info!(products, "Live prices refreshed");
    }
    let summary = system.cart_summary(locale).await?;
    for line in &summary.lines {
        info!(name = %line.view.name, quantity = line.quantity, unit = %line.unit_price.round_dp(2), "Cart line");
    }
    info!(subtotal = %summary.display_subtotal(), "Cart total");

    if let Some(deck) = system.product("p1", locale).await? {
        let names: Vec<String> = system
            .recommendations(&deck, 2)
            .await?
            .iter()
            .map(|v| v.name.clone())
            .collect();
        info!(?names, "Recommended");
    }

    // 4. Payment
    system.payment_completed("alice").await?;
    system.sync().flush().await?;
    info!(items = system.cart().total_items(), "Cart after payment");

    system.shutdown().await?;
    Ok(())
}
