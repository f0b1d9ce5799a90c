//! Update feed poller.
//!
//! Periodically fetches the mutable fields of every product and publishes them as one
//! immutable map. Each successful refresh swaps the whole map in a single `watch`
//! send, so readers never see a half-applied refresh.

use super::{merge, FeedError};
use crate::lifecycle::Shutdown;
use crate::model::{ProductId, ProductUpdate, ProductView};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Latest live fields per product.
pub type LiveMap = HashMap<ProductId, ProductUpdate>;

/// The lightweight price/stock endpoint.
#[async_trait]
pub trait UpdateFeed: Send + Sync {
    /// Live fields of every product.
    async fn fetch_updates(&self) -> Result<Vec<ProductUpdate>, FeedError>;
}

/// Whether the consuming surface is currently shown to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Foreground,
    Background,
}

/// Observable health of the poller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollerStatus {
    pub last_error: Option<FeedError>,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    /// Successful refreshes so far.
    pub refreshes: u64,
}

/// What a call to [`UpdateFeedPoller::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The map was replaced with this many products.
    Applied { products: usize },
    /// Another refresh was in flight, so this one was dropped.
    Skipped,
    /// The fetch failed; the previous map is kept.
    Failed,
    /// The poller was stopped while fetching; the result was thrown away.
    Discarded,
}

/// Read-only handle on the live map, shared by every merge call site.
#[derive(Debug, Clone)]
pub struct LiveUpdates {
    receiver: watch::Receiver<Arc<LiveMap>>,
}

impl LiveUpdates {
    pub fn get(&self, id: &ProductId) -> Option<ProductUpdate> {
        self.receiver.borrow().get(id).cloned()
    }

    /// The current map. Holding it does not block the poller.
    pub fn snapshot(&self) -> Arc<LiveMap> {
        Arc::clone(&*self.receiver.borrow())
    }

    /// Merges `view` against the current map.
    pub fn merge(&self, view: &Arc<ProductView>) -> Arc<ProductView> {
        merge(view, self.receiver.borrow().get(&view.id))
    }

    /// Waits for the next published map. Returns `false` once the poller is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

/// Clears the in-flight flag when the refresh ends, even if it is cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Polls an [`UpdateFeed`] on an adaptive interval.
///
/// # Scheduling
/// - Foreground: every `foreground_interval` (15s by default).
/// - Background: every `background_interval` (30s by default).
/// - Background to foreground: refresh immediately, then resume the foreground cadence.
///
/// At most one fetch is in flight. A refresh requested meanwhile is dropped, not
/// queued. Failures keep the previous map, are recorded in [`PollerStatus`] and are
/// retried on the next tick.
pub struct UpdateFeedPoller {
    feed: Arc<dyn UpdateFeed>,
    live: watch::Sender<Arc<LiveMap>>,
    status: watch::Sender<PollerStatus>,
    in_flight: AtomicBool,
    stopped: AtomicBool,
    foreground_interval: Duration,
    background_interval: Duration,
}

impl UpdateFeedPoller {
    pub fn new(feed: Arc<dyn UpdateFeed>, foreground_interval: Duration, background_interval: Duration) -> Self {
        let (live, _) = watch::channel(Arc::new(LiveMap::new()));
        let (status, _) = watch::channel(PollerStatus::default());
        Self {
            feed,
            live,
            status,
            in_flight: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            foreground_interval,
            background_interval,
        }
    }

    pub fn live_updates(&self) -> LiveUpdates {
        LiveUpdates {
            receiver: self.live.subscribe(),
        }
    }

    pub fn status(&self) -> watch::Receiver<PollerStatus> {
        self.status.subscribe()
    }

    pub fn interval_for(&self, visibility: Visibility) -> Duration {
        match visibility {
            Visibility::Foreground => self.foreground_interval,
            Visibility::Background => self.background_interval,
        }
    }

    /// Stops publishing. A fetch still in flight is discarded when it completes.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Fetches the feed once and replaces the live map. Never fails.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self.is_stopped() {
            return RefreshOutcome::Discarded;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Refresh already in flight, dropped");
            return RefreshOutcome::Skipped;
        }
        let _guard = InFlight(&self.in_flight);

        let result = self.feed.fetch_updates().await;
        if self.is_stopped() {
            debug!("Poller stopped during fetch, result discarded");
            return RefreshOutcome::Discarded;
        }

        match result {
            Ok(updates) => {
                let map: LiveMap = updates.into_iter().map(|u| (u.id.clone(), u)).collect();
                let products = map.len();
                self.live.send_replace(Arc::new(map));
                self.status.send_modify(|status| {
                    status.last_error = None;
                    status.consecutive_failures = 0;
                    status.last_success = Some(Utc::now());
                    status.refreshes += 1;
                });
                debug!(products, "Live map refreshed");
                RefreshOutcome::Applied { products }
            }
            Err(e) => {
                let mut failures = 0;
                self.status.send_modify(|status| {
                    status.consecutive_failures += 1;
                    status.last_error = Some(e.clone());
                    failures = status.consecutive_failures;
                });
                warn!(error = %e, consecutive_failures = failures, "Live refresh failed, keeping previous map");
                RefreshOutcome::Failed
            }
        }
    }

    /// Runs the polling loop until `shutdown` fires.
    ///
    /// Performs an initial refresh, then follows `visibility`. If the visibility sender
    /// goes away the poller keeps the last known cadence.
    pub async fn run(self: Arc<Self>, mut visibility: watch::Receiver<Visibility>, shutdown: Shutdown) {
        let mut current = *visibility.borrow_and_update();
        let mut watching = true;
        info!(?current, "Poller started");

        if !self.refresh_unless_cancelled(&shutdown).await {
            self.stop();
            info!("Poller stopped");
            return;
        }

        loop {
            let period = self.interval_for(current);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(period) => {
                    if !self.refresh_unless_cancelled(&shutdown).await {
                        break;
                    }
                }
                changed = visibility.changed(), if watching => {
                    if changed.is_err() {
                        debug!("Visibility source closed");
                        watching = false;
                        continue;
                    }
                    let next = *visibility.borrow_and_update();
                    let resumed = current == Visibility::Background && next == Visibility::Foreground;
                    current = next;
                    debug!(?current, "Visibility changed");
                    if resumed && !self.refresh_unless_cancelled(&shutdown).await {
                        break;
                    }
                }
            }
        }

        self.stop();
        info!("Poller stopped");
    }

    /// Returns `false` if shutdown fired before the refresh completed.
    async fn refresh_unless_cancelled(&self, shutdown: &Shutdown) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = self.refresh() => true,
        }
    }
}
