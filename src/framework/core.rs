//! # Core Document Framework
//!
//! This module defines the generic building blocks for keyed document actors.
//!
//! ## Key Types
//!
//! - [`Document`]: The trait that every stored document type implements.
//! - [`DocumentActor`]: The generic actor that owns a keyed collection of documents.
//! - [`DocumentClient`]: The generic client for communicating with the actor.
//! - [`FrameworkError`]: Common errors (e.g., ActorClosed, EntityError).
//!
//! Unlike an id-generating resource store, documents here are addressed by a key the
//! caller already knows (a user id, a tenant id, ...). Writes and deletes are routed
//! through hooks on the document so it can decide whether an incoming write is newer
//! than what it holds. Because the actor processes one request at a time, that
//! compare-and-apply step is atomic without any lock.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// =============================================================================
// 1. THE ABSTRACTION
// =============================================================================

/// Trait that any keyed document must implement to be managed by [`DocumentActor`].
///
/// # Write Semantics
/// - The first `Put` for a key builds the document with [`Document::from_put`].
/// - Later `Put`s go through [`Document::on_put`], which may reject stale payloads.
/// - A `Delete` never simply drops the entry: the document decides what remains
///   (typically a tombstone remembering the delete's version). A `Delete` for an unknown
///   key goes through [`Document::from_delete`] for the same reason.
/// - Reads only return documents for which [`Document::is_live`] holds, so a tombstone
///   reads exactly like a missing key.
#[async_trait]
pub trait Document: Clone + Send + Sync + 'static {
    /// The key documents are addressed by.
    type Key: Eq + Hash + Clone + Send + Sync + Display + Debug;

    /// Payload of a write.
    type Put: Send + Sync + Debug;

    /// Payload of a delete (e.g. the version the delete was issued at).
    type Delete: Send + Sync + Debug;

    /// What a write or delete reports back (applied, stale, ...).
    type Outcome: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the actor.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// The error type for this document.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build a document from the first write for `key`.
    fn from_put(key: Self::Key, put: Self::Put) -> Result<(Self, Self::Outcome), Self::Error>;

    /// Build the entry left behind by a delete for a key that holds nothing yet.
    fn from_delete(key: Self::Key, delete: Self::Delete) -> (Self, Self::Outcome);

    /// Apply a write to an existing document.
    async fn on_put(
        &mut self,
        put: Self::Put,
        ctx: &Self::Context,
    ) -> Result<Self::Outcome, Self::Error>;

    /// Apply a delete to an existing document.
    async fn on_delete(
        &mut self,
        delete: Self::Delete,
        ctx: &Self::Context,
    ) -> Result<Self::Outcome, Self::Error>;

    /// Whether reads should see this document.
    fn is_live(&self) -> bool {
        true
    }
}

// =============================================================================
// 2. THE GENERIC MESSAGES & ERRORS
// =============================================================================

/// Errors that can occur within the document framework itself.
#[derive(Debug, thiserror::Error)]
pub enum FrameworkError {
    #[error("Actor closed")]
    ActorClosed,
    #[error("Actor dropped response channel")]
    ActorDropped,
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Entity error: {0}")]
    EntityError(Box<dyn std::error::Error + Send + Sync>),
}

/// Type alias for the one-shot response channel used by actors.
pub type Response<T> = oneshot::Sender<Result<T, FrameworkError>>;

/// Message sent to a [`DocumentActor`].
///
/// Each variant carries a `respond_to` channel; the actor answers exactly once.
#[derive(Debug)]
pub enum DocumentRequest<T: Document> {
    Get {
        key: T::Key,
        respond_to: Response<Option<T>>,
    },
    Put {
        key: T::Key,
        put: T::Put,
        respond_to: Response<T::Outcome>,
    },
    Delete {
        key: T::Key,
        delete: T::Delete,
        respond_to: Response<T::Outcome>,
    },
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

/// The generic actor that owns a keyed collection of documents.
///
/// **Concurrency Model**:
/// The actor processes its messages *sequentially* in a loop, so the `store` needs no
/// `Mutex`. Two writers racing for the same key are serialized in arrival order and
/// each one is judged by the document's own hooks.
pub struct DocumentActor<T: Document> {
    receiver: mpsc::Receiver<DocumentRequest<T>>,
    store: HashMap<T::Key, T>,
}

impl<T: Document> DocumentActor<T> {
    /// Creates a new `DocumentActor` and its associated `DocumentClient`.
    ///
    /// # Arguments
    ///
    /// * `buffer_size` - The capacity of the MPSC channel. If the channel is full,
    ///   calls to the client wait until there is space.
    pub fn new(buffer_size: usize) -> (Self, DocumentClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
        };
        (actor, DocumentClient::new(sender))
    }

    /// Runs the actor's event loop, processing messages until every client is dropped.
    ///
    /// # Context Injection
    /// The `context` argument is injected into every document hook.
    pub async fn run(mut self, context: T::Context) {
        // Extract just the type name (e.g., "StoredCart" instead of the full path)
        let document_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(document_type, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                DocumentRequest::Get { key, respond_to } => {
                    let item = self.store.get(&key).filter(|doc| doc.is_live()).cloned();
                    debug!(document_type, %key, found = item.is_some(), "Get");
                    let _ = respond_to.send(Ok(item));
                }
                DocumentRequest::Put {
                    key,
                    put,
                    respond_to,
                } => {
                    debug!(document_type, %key, ?put, "Put");
                    let result = match self.store.get_mut(&key) {
                        Some(doc) => doc.on_put(put, &context).await,
                        None => T::from_put(key.clone(), put).map(|(doc, outcome)| {
                            self.store.insert(key.clone(), doc);
                            outcome
                        }),
                    };
                    match &result {
                        Ok(outcome) => {
                            info!(document_type, %key, ?outcome, size = self.store.len(), "Put done")
                        }
                        Err(e) => warn!(document_type, %key, error = %e, "Put failed"),
                    }
                    let _ = respond_to.send(result.map_err(|e| FrameworkError::EntityError(Box::new(e))));
                }
                DocumentRequest::Delete {
                    key,
                    delete,
                    respond_to,
                } => {
                    debug!(document_type, %key, ?delete, "Delete");
                    let result = match self.store.get_mut(&key) {
                        Some(doc) => doc.on_delete(delete, &context).await,
                        None => {
                            let (doc, outcome) = T::from_delete(key.clone(), delete);
                            self.store.insert(key.clone(), doc);
                            Ok(outcome)
                        }
                    };
                    match &result {
                        Ok(outcome) => info!(document_type, %key, ?outcome, "Delete done"),
                        Err(e) => warn!(document_type, %key, error = %e, "Delete failed"),
                    }
                    let _ = respond_to.send(result.map_err(|e| FrameworkError::EntityError(Box::new(e))));
                }
            }
        }

        info!(document_type, size = self.store.len(), "Shutdown");
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

/// A type-safe client for interacting with a [`DocumentActor`].
///
/// Holds only a sender, so cloning is cheap.
pub struct DocumentClient<T: Document> {
    sender: mpsc::Sender<DocumentRequest<T>>,
}

impl<T: Document> Clone for DocumentClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Document> DocumentClient<T> {
    pub fn new(sender: mpsc::Sender<DocumentRequest<T>>) -> Self {
        Self { sender }
    }

    pub async fn get(&self, key: T::Key) -> Result<Option<T>, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DocumentRequest::Get { key, respond_to })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn put(&self, key: T::Key, put: T::Put) -> Result<T::Outcome, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DocumentRequest::Put {
                key,
                put,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }

    pub async fn delete(&self, key: T::Key, delete: T::Delete) -> Result<T::Outcome, FrameworkError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DocumentRequest::Delete {
                key,
                delete,
                respond_to,
            })
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        response.await.map_err(|_| FrameworkError::ActorDropped)?
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // --- Document Definition ---

    /// Last-writer-wins register keyed by name.
    #[derive(Clone, Debug, PartialEq)]
    struct Register {
        value: Option<String>,
        stamp: u64,
    }

    #[derive(Debug, PartialEq)]
    enum Outcome {
        Applied,
        Stale,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("empty value")]
    struct EmptyValue;

    #[async_trait]
    impl Document for Register {
        type Key = String;
        type Put = (u64, String);
        type Delete = u64;
        type Outcome = Outcome;
        type Context = ();
        type Error = EmptyValue;

        fn from_put(_key: String, (stamp, value): (u64, String)) -> Result<(Self, Outcome), EmptyValue> {
            if value.is_empty() {
                return Err(EmptyValue);
            }
            Ok((Self { value: Some(value), stamp }, Outcome::Applied))
        }

        fn from_delete(_key: String, stamp: u64) -> (Self, Outcome) {
            (Self { value: None, stamp }, Outcome::Applied)
        }

        async fn on_put(&mut self, (stamp, value): (u64, String), _ctx: &()) -> Result<Outcome, EmptyValue> {
            if value.is_empty() {
                return Err(EmptyValue);
            }
            if stamp <= self.stamp {
                return Ok(Outcome::Stale);
            }
            self.value = Some(value);
            self.stamp = stamp;
            Ok(Outcome::Applied)
        }

        async fn on_delete(&mut self, stamp: u64, _ctx: &()) -> Result<Outcome, EmptyValue> {
            if stamp <= self.stamp {
                return Ok(Outcome::Stale);
            }
            self.value = None;
            self.stamp = stamp;
            Ok(Outcome::Applied)
        }

        fn is_live(&self) -> bool {
            self.value.is_some()
        }
    }

    // --- Test ---

    #[tokio::test]
    async fn test_document_actor_last_writer_wins() {
        let (actor, client) = DocumentActor::<Register>::new(10);
        tokio::spawn(actor.run(()));

        // 1. First write creates the document
        let outcome = client.put("a".into(), (1, "one".into())).await.unwrap();
        assert_eq!(outcome, Outcome::Applied);

        // 2. An older write is rejected
        let outcome = client.put("a".into(), (0, "zero".into())).await.unwrap();
        assert_eq!(outcome, Outcome::Stale);
        let doc = client.get("a".into()).await.unwrap().unwrap();
        assert_eq!(doc.value.as_deref(), Some("one"));

        // 3. Delete leaves a tombstone that reads as missing
        let outcome = client.delete("a".into(), 5).await.unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert!(client.get("a".into()).await.unwrap().is_none());

        // 4. A write older than the tombstone cannot resurrect it
        let outcome = client.put("a".into(), (3, "three".into())).await.unwrap();
        assert_eq!(outcome, Outcome::Stale);
        assert!(client.get("a".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_of_unknown_key_blocks_older_writes() {
        let (actor, client) = DocumentActor::<Register>::new(10);
        tokio::spawn(actor.run(()));

        client.delete("b".into(), 10).await.unwrap();
        let outcome = client.put("b".into(), (9, "late".into())).await.unwrap();
        assert_eq!(outcome, Outcome::Stale);
        assert!(client.get("b".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hook_errors_surface_as_entity_errors() {
        let (actor, client) = DocumentActor::<Register>::new(10);
        tokio::spawn(actor.run(()));

        let result = client.put("c".into(), (1, String::new())).await;
        assert!(matches!(result, Err(FrameworkError::EntityError(_))));
    }

    #[tokio::test]
    async fn test_client_reports_closed_actor() {
        let (actor, client) = DocumentActor::<Register>::new(10);
        drop(actor);

        let result = client.get("d".into()).await;
        assert!(matches!(result, Err(FrameworkError::ActorClosed)));
    }
}
