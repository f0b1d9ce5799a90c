mod common;

use async_trait::async_trait;
use catalog_sync::lifecycle::Shutdown;
use catalog_sync::live::{FeedError, RefreshOutcome, UpdateFeed, UpdateFeedPoller, Visibility};
use catalog_sync::locale::LocaleResolver;
use catalog_sync::model::{Locale, ProductId, ProductUpdate};
use common::seeded_catalog;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

/// Feed whose fetches block until released.
struct GatedFeed {
    fetches: AtomicUsize,
    started: Notify,
    release: Notify,
}

impl GatedFeed {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            fetches: AtomicUsize::new(0),
            started: Notify::new(),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl UpdateFeed for GatedFeed {
    async fn fetch_updates(&self) -> Result<Vec<ProductUpdate>, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        let mut update = ProductUpdate::empty("p1");
        update.price = Some(Decimal::new(1999, 2));
        Ok(vec![update])
    }
}

fn poller(feed: Arc<dyn UpdateFeed>) -> Arc<UpdateFeedPoller> {
    Arc::new(UpdateFeedPoller::new(feed, Duration::from_secs(15), Duration::from_secs(30)))
}

#[tokio::test]
async fn test_concurrent_refreshes_issue_one_fetch() {
    let feed = GatedFeed::new();
    let poller = poller(feed.clone());

    let first = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.refresh().await }
    });
    feed.started.notified().await;

    assert_eq!(poller.refresh().await, RefreshOutcome::Skipped);
    assert_eq!(poller.refresh().await, RefreshOutcome::Skipped);

    feed.release.notify_one();
    assert_eq!(first.await.unwrap(), RefreshOutcome::Applied { products: 1 });
    assert_eq!(feed.fetches.load(Ordering::SeqCst), 1);

    // The flag is cleared once the fetch completes.
    let again = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.refresh().await }
    });
    feed.started.notified().await;
    feed.release.notify_one();
    assert_eq!(again.await.unwrap(), RefreshOutcome::Applied { products: 1 });
    assert_eq!(feed.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stop_discards_fetch_in_flight() {
    let feed = GatedFeed::new();
    let poller = poller(feed.clone());
    let live = poller.live_updates();

    let pending = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.refresh().await }
    });
    feed.started.notified().await;
    poller.stop();
    feed.release.notify_one();

    assert_eq!(pending.await.unwrap(), RefreshOutcome::Discarded);
    assert!(live.snapshot().is_empty());
    assert_eq!(poller.refresh().await, RefreshOutcome::Discarded);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_map() {
    let catalog = seeded_catalog().await;
    let poller = poller(catalog.clone());
    let live = poller.live_updates();
    let status = poller.status();

    assert_eq!(poller.refresh().await, RefreshOutcome::Applied { products: 4 });
    let before = live.snapshot();

    catalog.set_offline(true);
    assert_eq!(poller.refresh().await, RefreshOutcome::Failed);
    assert_eq!(poller.refresh().await, RefreshOutcome::Failed);
    assert_eq!(*live.snapshot(), *before);
    {
        let status = status.borrow();
        assert_eq!(status.consecutive_failures, 2);
        assert!(matches!(status.last_error, Some(FeedError::Unavailable(_))));
        assert_eq!(status.refreshes, 1);
    }

    catalog.set_offline(false);
    assert_eq!(poller.refresh().await, RefreshOutcome::Applied { products: 4 });
    assert_eq!(status.borrow().consecutive_failures, 0);
    assert!(status.borrow().last_error.is_none());
}

#[tokio::test]
async fn test_merge_overlays_fresh_prices_on_resolved_views() {
    let catalog = seeded_catalog().await;
    let resolver = LocaleResolver::new(catalog.clone());
    let poller = poller(catalog.clone());
    let live = poller.live_updates();
    poller.refresh().await;

    let deck = resolver.resolve("p1", Locale::Fr).await.unwrap().unwrap().view;
    let sleeves = resolver.resolve("p4", Locale::Fr).await.unwrap().unwrap().view;
    // The feed echoes the base fields, so nothing changes yet.
    assert!(Arc::ptr_eq(&live.merge(&deck), &deck));

    let mut update = ProductUpdate::empty("p1");
    update.price = Some(Decimal::new(1500, 2));
    update.in_stock = Some(false);
    catalog.apply_update(&update).await;
    poller.refresh().await;

    let merged = live.merge(&deck);
    assert_eq!(merged.price, Decimal::new(1500, 2));
    assert!(!merged.in_stock);
    // Translated fields survive the merge.
    assert_eq!(merged.name, "Deck du Dragon");
    assert_eq!(deck.price, Decimal::new(2500, 2));
    assert!(Arc::ptr_eq(&live.merge(&sleeves), &sleeves));
    assert_eq!(live.get(&ProductId::from("p1")).and_then(|u| u.in_stock), Some(false));
}

#[tokio::test]
async fn test_subscribers_see_each_published_map() {
    let catalog = seeded_catalog().await;
    let poller = poller(catalog.clone());
    let mut live = poller.live_updates();

    let waiter = tokio::spawn(async move {
        let changed = live.changed().await;
        (changed, live.snapshot().len())
    });
    poller.refresh().await;

    assert_eq!(waiter.await.unwrap(), (true, 4));
}

#[tokio::test(start_paused = true)]
async fn test_interval_follows_visibility() {
    let catalog = seeded_catalog().await;
    let poller = poller(catalog.clone());
    let (visibility, visibility_rx) = watch::channel(Visibility::Foreground);
    let shutdown = Shutdown::new();
    let task = tokio::spawn(Arc::clone(&poller).run(visibility_rx, shutdown.clone()));

    // Initial refresh, then one every 15s in the foreground.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(catalog.feed_fetches(), 1);
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(catalog.feed_fetches(), 2);

    // t=16: backgrounded, next tick 30s later.
    visibility.send_replace(Visibility::Background);
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(catalog.feed_fetches(), 2);
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(catalog.feed_fetches(), 3);

    // t=47: foregrounded, immediate refresh, then back to 15s.
    visibility.send_replace(Visibility::Foreground);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(catalog.feed_fetches(), 4);
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(catalog.feed_fetches(), 5);

    shutdown.trigger();
    task.await.unwrap();
    assert!(poller.is_stopped());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(catalog.feed_fetches(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_to_background_does_not_refresh() {
    let catalog = seeded_catalog().await;
    let poller = poller(catalog.clone());
    let (visibility, visibility_rx) = watch::channel(Visibility::Foreground);
    let shutdown = Shutdown::new();
    let task = tokio::spawn(Arc::clone(&poller).run(visibility_rx, shutdown.clone()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    visibility.send_replace(Visibility::Background);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(catalog.feed_fetches(), 1);

    // A dropped visibility source keeps the last cadence.
    drop(visibility);
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(catalog.feed_fetches(), 2);

    shutdown.trigger();
    task.await.unwrap();
}
