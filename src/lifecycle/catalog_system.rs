use super::Shutdown;
use crate::cart::{
    CartStorage, CartStore, CartSummary, CartSynchronizer, Identity, JsonFileCartStorage, PaymentCompleted,
    StorageError, SyncHandle,
};
use crate::catalog::{CatalogSource, ProductQuery};
use crate::config::{CatalogConfig, ConfigError};
use crate::framework::FrameworkError;
use crate::live::{LiveUpdates, UpdateFeed, UpdateFeedPoller, Visibility};
use crate::locale::{LocaleResolver, ResolveError, Variant};
use crate::model::{Locale, ProductId, ProductView, UserId};
use crate::recommend::Recommender;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Errors from starting or stopping a [`CatalogSystem`].
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Cart storage could not be opened: {0}")]
    Storage(#[from] StorageError),

    #[error("{task} task failed: {reason}")]
    TaskFailed { task: &'static str, reason: String },
}

/// How long shutdown waits for the last cart write.
pub const FINAL_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// The runtime orchestrator of one storefront session.
///
/// `CatalogSystem` is responsible for:
/// - **Lifecycle Management**: spawning the cart storage actor, the update feed poller
///   and the cart synchronizer, and stopping them in order
/// - **Dependency Wiring**: sharing one version clock between the cart and its
///   synchronizer, one live map between every merge call site
/// - **Session Surface**: identity, visibility and payment signals in; merged product
///   views, variants and priced carts out
///
/// # Example
///
/// ```ignore
/// let system = CatalogSystem::start(config, catalog.clone(), catalog).await?;
///
/// system.sign_in("alice");
/// let deck = system.product("dragon-deck", Locale::Fr).await?;
/// system.cart().add("p1", 2);
///
/// system.shutdown().await?;
/// ```
pub struct CatalogSystem {
    config: CatalogConfig,
    resolver: LocaleResolver,
    poller: Arc<UpdateFeedPoller>,
    live: LiveUpdates,
    cart: CartStore,
    sync: SyncHandle,
    storage: Arc<dyn CartStorage>,
    identity: watch::Sender<Identity>,
    visibility: watch::Sender<Visibility>,
    recommender: Recommender,
    shutdown: Shutdown,

    /// Background tasks in shutdown order.
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl CatalogSystem {
    /// Starts every component.
    ///
    /// Carts are kept by an in-memory storage actor, or in JSON files when
    /// `config.cart_dir` is set.
    pub async fn start(
        config: CatalogConfig,
        catalog: Arc<dyn CatalogSource>,
        feed: Arc<dyn UpdateFeed>,
    ) -> Result<Self, SystemError> {
        config.validate()?;

        match &config.cart_dir {
            Some(dir) => {
                info!(dir = %dir.display(), "Using JSON file cart storage");
                let storage = Arc::new(JsonFileCartStorage::open(dir.clone()).await?);
                Ok(Self::launch(config, catalog, feed, storage, Vec::new()))
            }
            None => {
                let (actor, client) = crate::cart_storage_actor::new(config.actor_buffer);
                let handle = tokio::spawn(actor.run(()));
                Ok(Self::launch(
                    config,
                    catalog,
                    feed,
                    Arc::new(client),
                    vec![("cart storage", handle)],
                ))
            }
        }
    }

    /// Starts every component on top of a caller-provided cart storage.
    pub fn start_with_storage(
        config: CatalogConfig,
        catalog: Arc<dyn CatalogSource>,
        feed: Arc<dyn UpdateFeed>,
        storage: Arc<dyn CartStorage>,
    ) -> Result<Self, SystemError> {
        config.validate()?;
        Ok(Self::launch(config, catalog, feed, storage, Vec::new()))
    }

    fn launch(
        config: CatalogConfig,
        catalog: Arc<dyn CatalogSource>,
        feed: Arc<dyn UpdateFeed>,
        storage: Arc<dyn CartStorage>,
        mut owned: Vec<(&'static str, JoinHandle<()>)>,
    ) -> Self {
        let shutdown = Shutdown::new();

        // 1. Live updates
        let (visibility, visibility_rx) = watch::channel(Visibility::Foreground);
        let poller = Arc::new(UpdateFeedPoller::new(
            feed,
            config.poll_interval(Visibility::Foreground),
            config.poll_interval(Visibility::Background),
        ));
        let live = poller.live_updates();
        let poller_handle = tokio::spawn(Arc::clone(&poller).run(visibility_rx, shutdown.clone()));

        // 2. Cart and its synchronizer
        let cart = CartStore::new();
        let (identity, identity_rx) = watch::channel(Identity::SignedOut);
        let (synchronizer, sync) = CartSynchronizer::new(
            cart.clone(),
            Arc::clone(&storage),
            identity_rx,
            config.cart_debounce(),
            config.actor_buffer,
        );
        let sync_handle = tokio::spawn(synchronizer.run(shutdown.clone()));

        let mut handles = vec![("poller", poller_handle), ("cart synchronizer", sync_handle)];
        handles.append(&mut owned);

        info!(default_locale = %config.default_locale, "Catalog system started");
        Self {
            resolver: LocaleResolver::new(catalog),
            recommender: Recommender::from_config(&config),
            config,
            poller,
            live,
            cart,
            sync,
            storage,
            identity,
            visibility,
            shutdown,
            handles,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn live(&self) -> &LiveUpdates {
        &self.live
    }

    pub fn poller(&self) -> &UpdateFeedPoller {
        &self.poller
    }

    pub fn resolver(&self) -> &LocaleResolver {
        &self.resolver
    }

    pub fn sync(&self) -> &SyncHandle {
        &self.sync
    }

    pub fn sign_in(&self, user: impl Into<UserId>) {
        self.identity.send_replace(Identity::SignedIn(user.into()));
    }

    pub fn sign_out(&self) {
        self.identity.send_replace(Identity::SignedOut);
    }

    pub fn set_visibility(&self, visibility: Visibility) {
        self.visibility.send_replace(visibility);
    }

    /// Forwards a payment gateway completion event.
    pub async fn payment_completed(&self, user: impl Into<UserId>) -> Result<(), FrameworkError> {
        self.sync
            .payment_completed(PaymentCompleted { user_id: user.into() })
            .await
    }

    /// Resolves `identifier` for `locale` and overlays the live fields.
    pub async fn product(&self, identifier: &str, locale: Locale) -> Result<Option<Arc<ProductView>>, ResolveError> {
        let resolved = self.resolver.resolve(identifier, locale).await?;
        Ok(resolved.map(|r| self.live.merge(&r.view)))
    }

    /// Sibling variants of `product_id` in locales other than `locale`.
    pub async fn variants(&self, product_id: &ProductId, locale: Locale) -> Result<Vec<Variant>, ResolveError> {
        self.resolver.list_variants(product_id, locale, &[]).await
    }

    /// Prices the current cart against live-merged views in `locale`.
    pub async fn cart_summary(&self, locale: Locale) -> Result<CartSummary, ResolveError> {
        let state = self.cart.snapshot();
        let mut views = HashMap::with_capacity(state.lines.len());
        for id in state.lines.keys() {
            if let Some(resolved) = self.resolver.resolve(id.as_str(), locale).await? {
                views.insert(id.clone(), resolved.view);
            }
        }
        Ok(CartSummary::build(&state, &views, &self.live.snapshot()))
    }

    /// Up to `k` live-merged products from the same category as `product`.
    pub async fn recommendations(
        &self,
        product: &ProductView,
        k: usize,
    ) -> Result<Vec<Arc<ProductView>>, ResolveError> {
        let query = ProductQuery::new().category(product.category.clone());
        let candidates: Vec<Arc<ProductView>> = self
            .resolver
            .list(&query, product.locale)
            .await?
            .into_iter()
            .map(|r| self.live.merge(&r.view))
            .collect();
        Ok(self.recommender.recommend(product, &candidates, k))
    }

    /// Gracefully shuts down the whole system.
    ///
    /// 1. Flushes the pending cart write, giving storage at most
    ///    [`FINAL_FLUSH_TIMEOUT`] to answer.
    /// 2. Stops the poller and the synchronizer (timers cancelled, late results dropped).
    /// 3. Drops the storage handles so the storage actor drains and exits.
    /// 4. Joins every task, reporting the first one that panicked.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down catalog system...");

        match tokio::time::timeout(FINAL_FLUSH_TIMEOUT, self.sync.flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Final cart flush failed"),
            Err(_) => warn!(
                timeout_secs = FINAL_FLUSH_TIMEOUT.as_secs(),
                "Final cart flush timed out, abandoning pending writes"
            ),
        }

        self.poller.stop();
        self.shutdown.trigger();

        // Closing the channels lets the storage actor exit once in-flight writes finish.
        drop(self.sync);
        drop(self.storage);
        drop(self.identity);
        drop(self.visibility);

        let mut result = Ok(());
        for (task, handle) in self.handles {
            if let Err(e) = handle.await {
                error!(task, error = %e, "Task failed");
                if result.is_ok() {
                    result = Err(SystemError::TaskFailed {
                        task,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!("Catalog system shutdown complete.");
        result
    }
}
