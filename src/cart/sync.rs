//! Cart synchronizer: the debounced bridge between [`CartStore`] and [`CartStorage`].
//!
//! # Lifecycle per identity
//! ```text
//!  SignedOut ──sign in──> Loading ──load done──> Ready ──sign out──> SignedOut
//!                          │    ▲                  │
//!                          │    └─ load failed,    └── cart edits are debounced
//!                          │       retried after       and saved (or deleted when empty)
//!                          │       one debounce
//!                          └── cart edits are not persisted
//! ```
//!
//! # Ordering
//! Every write carries the version of the cart mutation it captures, and every
//! post-payment delete carries a version ticked when the payment event arrived. Storage
//! applies last-write-wins on those versions, so a debounced save still in flight when
//! the payment clear lands is rejected as stale whichever reaches storage first.

use super::{CartDocument, CartState, CartStorage, CartStore, ChangeOrigin, StorageError, WriteOutcome};
use crate::framework::FrameworkError;
use crate::lifecycle::Shutdown;
use crate::model::{CartLine, UserId, Version};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Who is using the session, as reported by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    SignedOut,
    SignedIn(UserId),
}

impl Identity {
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Identity::SignedOut => None,
            Identity::SignedIn(user) => Some(user),
        }
    }
}

/// "Payment completed for identity X", from the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCompleted {
    pub user_id: UserId,
}

/// Messages accepted by a running [`CartSynchronizer`].
#[derive(Debug)]
pub enum SyncCommand {
    PaymentCompleted(PaymentCompleted),
    /// Write the pending change now and answer once no write is in flight.
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    /// No identity; nothing is persisted.
    #[default]
    Idle,
    /// The persisted cart of the new identity is being fetched, or its last fetch
    /// failed and is retried every debounce interval.
    Loading,
    Ready,
}

/// Observable state of the synchronizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub identity: Identity,
    pub phase: SyncPhase,
    /// A debounced save is scheduled.
    pub save_scheduled: bool,
    /// Highest version storage confirmed for the current identity.
    pub persisted: Version,
    /// Post-payment deletes that failed and await retry, ordered by user.
    pub pending_deletes: Vec<(UserId, Version)>,
    pub last_error: Option<String>,
}

/// Handle for sending commands to a running synchronizer.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    /// Clears the persisted cart of `event.user_id` and, if that is the current
    /// identity, the local cart.
    pub async fn payment_completed(&self, event: PaymentCompleted) -> Result<(), FrameworkError> {
        self.commands
            .send(SyncCommand::PaymentCompleted(event))
            .await
            .map_err(|_| FrameworkError::ActorClosed)
    }

    /// Forces the pending debounced write and waits for it to settle.
    pub async fn flush(&self) -> Result<(), FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.commands
            .send(SyncCommand::Flush(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)
    }

    /// Waits until the synchronizer reports [`SyncPhase::Ready`].
    ///
    /// Right after an identity change the previous status may still be visible, so
    /// callers switching identities should wait for the new identity first.
    pub async fn wait_ready(&self) -> Result<(), FrameworkError> {
        let mut status = self.status.clone();
        status
            .wait_for(|s| s.phase == SyncPhase::Ready)
            .await
            .map(|_| ())
            .map_err(|_| FrameworkError::ActorClosed)
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Save,
    /// The cart was emptied by the user.
    Delete,
    /// The cart was settled by a payment.
    Settlement,
}

struct WriteDone {
    user: UserId,
    version: Version,
    kind: WriteKind,
    result: Result<WriteOutcome, StorageError>,
}

struct LoadDone {
    generation: u64,
    user: UserId,
    result: Result<Option<CartDocument>, StorageError>,
}

/// Keeps one [`CartStore`] mirrored to durable storage.
///
/// - **Load**: when an identity signs in, its persisted cart replaces the local one.
///   If nothing is persisted, the anonymous cart is adopted and saved.
/// - **Save**: local edits are collapsed by a trailing debounce; the latest snapshot is
///   saved, or deleted when empty.
/// - **Payment**: clears the local cart and deletes the persisted one.
/// - **Identity switch**: a pending save of the previous identity is written first, and
///   a load still in flight for it is discarded. Signing out empties the local cart.
///
/// Storage failures are logged and recorded in [`SyncStatus`], and the failed load or
/// write is retried one debounce interval later. Until the persisted cart has been read
/// nothing is written for the identity. The local cart stays authoritative for the
/// session.
pub struct CartSynchronizer {
    cart: CartStore,
    storage: Arc<dyn CartStorage>,
    identity_source: watch::Receiver<Identity>,
    commands: mpsc::Receiver<SyncCommand>,
    status: watch::Sender<SyncStatus>,
    debounce: Duration,

    identity: Identity,
    phase: SyncPhase,
    generation: u64,
    /// Highest version handed to storage for the current identity.
    issued: Version,
    persisted: Version,
    deadline: Option<Instant>,
    pending_deletes: HashMap<UserId, Version>,
    flush_waiters: Vec<oneshot::Sender<()>>,
    last_error: Option<String>,
    load_task: Option<JoinHandle<()>>,
    loads_tx: mpsc::Sender<LoadDone>,
    loads_rx: mpsc::Receiver<LoadDone>,
    writes: JoinSet<WriteDone>,
}

impl CartSynchronizer {
    /// Creates a synchronizer and its handle. Nothing happens until [`run`](Self::run).
    pub fn new(
        cart: CartStore,
        storage: Arc<dyn CartStorage>,
        identity: watch::Receiver<Identity>,
        debounce: Duration,
        buffer_size: usize,
    ) -> (Self, SyncHandle) {
        let (commands_tx, commands) = mpsc::channel(buffer_size);
        let (status, status_rx) = watch::channel(SyncStatus::default());
        let (loads_tx, loads_rx) = mpsc::channel(4);
        let synchronizer = Self {
            cart,
            storage,
            identity_source: identity,
            commands,
            status,
            debounce,
            identity: Identity::SignedOut,
            phase: SyncPhase::Idle,
            generation: 0,
            issued: Version::default(),
            persisted: Version::default(),
            deadline: None,
            pending_deletes: HashMap::new(),
            flush_waiters: Vec::new(),
            last_error: None,
            load_task: None,
            loads_tx,
            loads_rx,
            writes: JoinSet::new(),
        };
        let handle = SyncHandle {
            commands: commands_tx,
            status: status_rx,
        };
        (synchronizer, handle)
    }

    /// Runs until `shutdown` fires.
    ///
    /// On exit the debounce timer is dropped, a load in flight is aborted, and writes in
    /// flight are left to finish with their results ignored.
    pub async fn run(mut self, shutdown: Shutdown) {
        info!("Cart synchronizer started");
        let mut changes = self.cart.subscribe();
        changes.borrow_and_update();
        let mut identity_open = true;
        let mut commands_open = true;

        let initial = self.identity_source.borrow_and_update().clone();
        self.switch_identity(initial);

        loop {
            let deadline = self.deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = self.identity_source.changed(), if identity_open => {
                    if changed.is_err() {
                        debug!("Identity source closed");
                        identity_open = false;
                        continue;
                    }
                    let next = self.identity_source.borrow_and_update().clone();
                    self.switch_identity(next);
                }
                Ok(()) = changes.changed() => {
                    let state = changes.borrow_and_update().clone();
                    self.on_cart_changed(&state);
                }
                Some(load) = self.loads_rx.recv() => self.on_load_done(load),
                Some(joined) = self.writes.join_next(), if !self.writes.is_empty() => {
                    self.on_write_joined(joined);
                    if self.writes.is_empty() {
                        self.answer_flushes();
                    }
                }
                _ = tokio::time::sleep_until(deadline), if self.deadline.is_some() => {
                    self.deadline = None;
                    self.retry_load();
                    self.flush();
                }
                command = self.commands.recv(), if commands_open => match command {
                    Some(SyncCommand::PaymentCompleted(event)) => self.on_payment_completed(event),
                    Some(SyncCommand::Flush(respond_to)) => {
                        self.deadline = None;
                        self.retry_load();
                        self.flush();
                        self.flush_waiters.push(respond_to);
                        if self.writes.is_empty() {
                            self.answer_flushes();
                        }
                    }
                    None => commands_open = false,
                },
            }
            self.publish();
        }

        self.deadline = None;
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
        // Pending flushes see the synchronizer as gone.
        self.flush_waiters.clear();
        self.writes.detach_all();
        info!("Cart synchronizer stopped");
    }

    fn switch_identity(&mut self, next: Identity) {
        if next == self.identity {
            return;
        }

        // Whatever the previous identity still owes storage goes out first.
        if self.identity.user().is_some() {
            self.deadline = None;
            self.flush();
        }

        if let Some(task) = self.load_task.take() {
            task.abort();
        }
        self.generation += 1;
        self.issued = Version::default();
        self.persisted = Version::default();
        self.last_error = None;

        // Another identity's cart must never leak into this one.
        if self.identity.user().is_some() {
            self.cart
                .replace(Vec::new(), self.cart.clock().tick(), ChangeOrigin::Remote);
        }

        self.identity = next;
        match self.identity.user().cloned() {
            None => {
                info!("Signed out");
                self.phase = SyncPhase::Idle;
            }
            Some(user) => {
                info!(user_id = %user, "Loading cart");
                self.phase = SyncPhase::Loading;
                self.start_load(user);
            }
        }
        self.publish();
    }

    fn start_load(&mut self, user: UserId) {
        let storage = Arc::clone(&self.storage);
        let loads = self.loads_tx.clone();
        let generation = self.generation;
        self.load_task = Some(tokio::spawn(async move {
            let result = storage.load(&user).await;
            let _ = loads
                .send(LoadDone {
                    generation,
                    user,
                    result,
                })
                .await;
        }));
    }

    /// Fetches the persisted cart again if the last attempt failed.
    fn retry_load(&mut self) {
        if self.phase != SyncPhase::Loading || self.load_task.is_some() {
            return;
        }
        if let Some(user) = self.identity.user().cloned() {
            info!(user_id = %user, "Retrying cart load");
            self.start_load(user);
        }
    }

    fn on_load_done(&mut self, load: LoadDone) {
        if load.generation != self.generation {
            debug!(user_id = %load.user, "Discarding load for a previous identity");
            return;
        }
        self.load_task = None;

        let persisted = match load.result {
            Ok(persisted) => persisted,
            Err(e) => {
                // Writing before the persisted cart is read would overwrite it.
                warn!(user_id = %load.user, error = %e, "Cart load failed, will retry");
                self.last_error = Some(e.to_string());
                self.arm_timer();
                return;
            }
        };
        self.phase = SyncPhase::Ready;
        self.last_error = None;

        match persisted {
            Some(document) => {
                info!(user_id = %load.user, lines = document.lines.len(), version = %document.version, "Cart loaded");
                self.cart.clock().observe(document.version);
                self.cart
                    .replace(document.lines, document.version, ChangeOrigin::Remote);
                self.issued = document.version;
                self.persisted = document.version;
            }
            None => {
                let snapshot = self.cart.snapshot();
                if snapshot.is_empty() {
                    debug!(user_id = %load.user, "No persisted cart");
                    self.issued = snapshot.version;
                } else {
                    info!(user_id = %load.user, lines = snapshot.lines.len(), "No persisted cart, keeping local cart");
                    self.arm_timer();
                }
            }
        }
    }

    fn on_cart_changed(&mut self, state: &CartState) {
        if state.origin != ChangeOrigin::Local {
            return;
        }
        if self.phase == SyncPhase::Ready {
            self.arm_timer();
        }
    }

    /// (Re)starts the debounce timer. On expiry a failed load is retried, failed
    /// post-payment deletes are reissued and the latest snapshot is written.
    fn arm_timer(&mut self) {
        self.deadline = Some(Instant::now() + self.debounce);
    }

    fn on_payment_completed(&mut self, event: PaymentCompleted) {
        let version = self.cart.clock().tick();
        info!(user_id = %event.user_id, %version, "Payment completed, clearing cart");

        if self.identity.user() == Some(&event.user_id) {
            if self.phase == SyncPhase::Loading {
                // The load may have read the cart before this delete lands.
                if let Some(task) = self.load_task.take() {
                    task.abort();
                }
                self.generation += 1;
                self.phase = SyncPhase::Ready;
            }
            self.deadline = None;
            self.issued = version;
            self.cart.replace(Vec::new(), version, ChangeOrigin::Settlement);
        }
        self.spawn_write(event.user_id, version, WriteKind::Settlement, Vec::new());
    }

    /// Hands the current snapshot to storage if it is newer than anything issued.
    fn flush(&mut self) {
        for (user, version) in std::mem::take(&mut self.pending_deletes) {
            info!(user_id = %user, %version, "Retrying post-payment delete");
            self.spawn_write(user, version, WriteKind::Settlement, Vec::new());
        }

        let Some(user) = self.identity.user().cloned() else {
            return;
        };
        if self.phase != SyncPhase::Ready {
            return;
        }
        let snapshot = self.cart.snapshot();
        if snapshot.version <= self.issued {
            debug!(user_id = %user, "Cart unchanged, nothing to write");
            return;
        }
        self.issued = snapshot.version;

        if snapshot.is_empty() {
            self.spawn_write(user, snapshot.version, WriteKind::Delete, Vec::new());
        } else {
            self.spawn_write(user, snapshot.version, WriteKind::Save, snapshot.to_lines());
        }
    }

    fn spawn_write(&mut self, user: UserId, version: Version, kind: WriteKind, lines: Vec<CartLine>) {
        debug!(user_id = %user, %version, ?kind, lines = lines.len(), "Writing cart");
        let storage = Arc::clone(&self.storage);
        self.writes.spawn(async move {
            let result = match kind {
                WriteKind::Save => storage.save(&user, CartDocument::new(lines, version)).await,
                WriteKind::Delete | WriteKind::Settlement => storage.delete(&user, version).await,
            };
            WriteDone {
                user,
                version,
                kind,
                result,
            }
        });
    }

    fn on_write_joined(&mut self, joined: Result<WriteDone, JoinError>) {
        match joined {
            Ok(done) => self.on_write_done(done),
            Err(e) => warn!(error = %e, "Cart write task failed"),
        }
    }

    fn on_write_done(&mut self, done: WriteDone) {
        let current = self.identity.user() == Some(&done.user);
        match done.result {
            Ok(WriteOutcome::Applied) => {
                debug!(user_id = %done.user, version = %done.version, kind = ?done.kind, "Cart write applied");
                if done.kind == WriteKind::Settlement {
                    info!(user_id = %done.user, "Persisted cart cleared");
                }
                if current {
                    self.persisted = self.persisted.max(done.version);
                    self.last_error = None;
                }
            }
            Ok(WriteOutcome::Stale { current: stored }) => {
                debug!(user_id = %done.user, version = %done.version, %stored, "Cart write superseded");
                self.cart.clock().observe(stored);
                if current {
                    self.persisted = self.persisted.max(stored);
                }
            }
            Err(e) if done.kind == WriteKind::Settlement => {
                warn!(user_id = %done.user, error = %e, "Post-payment delete failed, will retry");
                self.last_error = Some(e.to_string());
                let version = self.pending_deletes.entry(done.user).or_insert(done.version);
                *version = (*version).max(done.version);
                self.arm_timer();
            }
            Err(e) => {
                warn!(user_id = %done.user, error = %e, "Cart write failed, will retry");
                if current {
                    self.last_error = Some(e.to_string());
                    // A newer write already issued supersedes this one.
                    if self.issued == done.version {
                        self.issued = self.persisted;
                        self.arm_timer();
                    }
                }
            }
        }
    }

    fn answer_flushes(&mut self) {
        for respond_to in self.flush_waiters.drain(..) {
            let _ = respond_to.send(());
        }
    }

    fn publish(&self) {
        let mut pending_deletes: Vec<(UserId, Version)> = self
            .pending_deletes
            .iter()
            .map(|(user, version)| (user.clone(), *version))
            .collect();
        pending_deletes.sort();
        let status = SyncStatus {
            identity: self.identity.clone(),
            phase: self.phase,
            save_scheduled: self.deadline.is_some(),
            persisted: self.persisted,
            pending_deletes,
            last_error: self.last_error.clone(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}
