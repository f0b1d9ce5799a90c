#![allow(dead_code)]

use async_trait::async_trait;
use catalog_sync::cart::{CartDocument, CartStorage, CartStore, CartSynchronizer, Identity, StorageError, SyncHandle, WriteOutcome};
use catalog_sync::catalog::InMemoryCatalog;
use catalog_sync::clients::CartStorageClient;
use catalog_sync::lifecycle::Shutdown;
use catalog_sync::model::{Locale, Product, Translation, UserId, Version};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

/// Cart storage over a real storage actor that records every call and can hold or
/// fail them on demand.
pub struct TestStorage {
    pub inner: CartStorageClient,
    pub saves: Mutex<Vec<(UserId, CartDocument)>>,
    pub deletes: Mutex<Vec<(UserId, Version)>>,
    pub outcomes: Mutex<Vec<WriteOutcome>>,
    pub loads: AtomicUsize,
    fail_loads: AtomicUsize,
    fail_saves: AtomicBool,
    fail_deletes: AtomicUsize,
    hold_saves: AtomicBool,
    save_permits: Semaphore,
    hold_loads: AtomicBool,
    load_permits: Semaphore,
}

impl TestStorage {
    pub fn new() -> Arc<Self> {
        let (actor, client) = catalog_sync::cart_storage_actor::new(16);
        tokio::spawn(actor.run(()));
        Arc::new(Self {
            inner: client,
            saves: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            outcomes: Mutex::new(Vec::new()),
            loads: AtomicUsize::new(0),
            fail_loads: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
            fail_deletes: AtomicUsize::new(0),
            hold_saves: AtomicBool::new(false),
            save_permits: Semaphore::new(0),
            hold_loads: AtomicBool::new(false),
            load_permits: Semaphore::new(0),
        })
    }

    /// Fails the next `count` loads.
    pub fn fail_loads(&self, count: usize) {
        self.fail_loads.store(count, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Fails the next `count` deletes.
    pub fn fail_deletes(&self, count: usize) {
        self.fail_deletes.store(count, Ordering::SeqCst);
    }

    /// Saves wait for [`TestStorage::release_saves`] before reaching the actor.
    pub fn hold_saves(&self) {
        self.hold_saves.store(true, Ordering::SeqCst);
    }

    pub fn release_saves(&self, count: usize) {
        self.save_permits.add_permits(count);
    }

    pub fn hold_loads(&self) {
        self.hold_loads.store(true, Ordering::SeqCst);
    }

    pub fn release_loads(&self, count: usize) {
        self.load_permits.add_permits(count);
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.lock().unwrap().len()
    }

    pub fn last_save(&self) -> Option<CartDocument> {
        self.saves.lock().unwrap().last().map(|(_, doc)| doc.clone())
    }

    /// What is durably stored, bypassing the recording layer.
    pub async fn stored(&self, user: &str) -> Option<CartDocument> {
        self.inner.load(&UserId::from(user)).await.unwrap()
    }
}

#[async_trait]
impl CartStorage for TestStorage {
    async fn load(&self, user: &UserId) -> Result<Option<CartDocument>, StorageError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.hold_loads.load(Ordering::SeqCst) {
            self.load_permits.acquire().await.unwrap().forget();
        }
        if take_one(&self.fail_loads) {
            return Err(StorageError::Backend("injected load failure".into()));
        }
        self.inner.load(user).await
    }

    async fn save(&self, user: &UserId, document: CartDocument) -> Result<WriteOutcome, StorageError> {
        self.saves.lock().unwrap().push((user.clone(), document.clone()));
        if self.hold_saves.load(Ordering::SeqCst) {
            self.save_permits.acquire().await.unwrap().forget();
        }
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected save failure".into()));
        }
        let outcome = self.inner.save(user, document).await?;
        self.outcomes.lock().unwrap().push(outcome);
        Ok(outcome)
    }

    async fn delete(&self, user: &UserId, version: Version) -> Result<WriteOutcome, StorageError> {
        self.deletes.lock().unwrap().push((user.clone(), version));
        if take_one(&self.fail_deletes) {
            return Err(StorageError::Backend("injected delete failure".into()));
        }
        let outcome = self.inner.delete(user, version).await?;
        self.outcomes.lock().unwrap().push(outcome);
        Ok(outcome)
    }
}

/// Decrements `counter` unless it is already zero; true if it was decremented.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// A running synchronizer with everything a test needs to drive it.
pub struct SyncHarness {
    pub cart: CartStore,
    pub handle: SyncHandle,
    pub identity: watch::Sender<Identity>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<()>,
}

impl SyncHarness {
    pub fn start(storage: Arc<dyn CartStorage>, identity: Identity) -> Self {
        Self::start_with_cart(storage, identity, CartStore::new())
    }

    pub fn start_with_cart(storage: Arc<dyn CartStorage>, identity: Identity, cart: CartStore) -> Self {
        let (identity_tx, identity_rx) = watch::channel(identity);
        let (synchronizer, handle) =
            CartSynchronizer::new(cart.clone(), storage, identity_rx, Duration::from_secs(1), 16);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(synchronizer.run(shutdown.clone()));
        Self {
            cart,
            handle,
            identity: identity_tx,
            shutdown,
            task,
        }
    }

    /// Switches identity and waits until its cart is loaded.
    pub async fn sign_in(&self, user: &str) {
        let identity = Identity::SignedIn(UserId::from(user));
        self.identity.send_replace(identity.clone());
        let mut status = self.handle.subscribe();
        status
            .wait_for(|s| s.identity == identity && s.phase == catalog_sync::cart::SyncPhase::Ready)
            .await
            .unwrap();
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        self.task.await.unwrap();
    }
}

pub fn signed_in(user: &str) -> Identity {
    Identity::SignedIn(UserId::from(user))
}

/// Lets every ready task run (time is paused in most cart tests).
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// A small catalog with a French/Japanese variant family and one duplicate-free
/// accessory.
pub async fn seeded_catalog() -> Arc<InMemoryCatalog> {
    let catalog = Arc::new(InMemoryCatalog::new());
    catalog
        .insert_product(Product::new("p1", "dragon-deck-en", "Dragon Deck", Decimal::new(2500, 2)).with_category("decks"))
        .await;
    catalog
        .insert_product(Product::new("p2", "dragon-deck-jp", "Dragon Deck JP", Decimal::new(3000, 2)).with_category("decks"))
        .await;
    catalog
        .insert_product(Product::new("p3", "phoenix-deck-en", "Phoenix Deck", Decimal::new(2000, 2)).with_category("decks"))
        .await;
    catalog
        .insert_product(Product::new("p4", "sleeves-en", "Sleeves", Decimal::new(500, 2)).with_category("accessories"))
        .await;

    catalog.insert_translation(Translation::new(1, Locale::En, "Dragon Deck")).await;
    catalog
        .insert_translation(Translation::new(2, Locale::Fr, "Deck du Dragon").with_description("Soixante cartes"))
        .await;
    catalog.insert_translation(Translation::new(3, Locale::Jp, "ドラゴンデッキ")).await;
    catalog.insert_translation(Translation::new(4, Locale::Es, "Mazo del Dragón")).await;
    for (product, translation) in [("p1", 1), ("p1", 2), ("p2", 3), ("p2", 2), ("p2", 4)] {
        catalog.link(product, translation).await;
    }
    catalog
}
