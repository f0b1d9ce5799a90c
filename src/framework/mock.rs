//! # Mock Framework
//!
//! Utilities for testing code that talks to a [`DocumentClient`] without spawning a
//! real [`DocumentActor`](crate::framework::DocumentActor).
//!
//! Two styles are available:
//!
//! - [`MockClient`]: queue expectations up front (`expect_put().return_err(..)`), hand
//!   out the client, then [`MockClient::verify`] that every expectation was consumed.
//!   Ideal for injecting storage failures.
//! - [`create_mock_client`] plus the `expect_*` helpers: receive each request yourself
//!   and answer it whenever you like. Ideal for controlling the order in which
//!   concurrent requests are answered.

use crate::framework::{Document, DocumentClient, DocumentRequest, FrameworkError, Response};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// An expected request and the canned response for it.
enum Expectation<T: Document> {
    Get {
        response: Result<Option<T>, FrameworkError>,
    },
    Put {
        response: Result<T::Outcome, FrameworkError>,
    },
    Delete {
        response: Result<T::Outcome, FrameworkError>,
    },
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

fn push<T: Document>(expectations: &Expectations<T>, expectation: Expectation<T>) {
    expectations
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push_back(expectation);
}

/// A mock client with expectation tracking for fluent testing.
///
/// # Example
/// ```ignore
/// let mut mock = MockClient::<StoredCart>::new();
/// mock.expect_get().return_ok(None);
/// mock.expect_put().return_err(FrameworkError::ActorClosed);
///
/// let client = mock.client();
/// // Use client in tests...
/// mock.verify(); // Ensures all expectations were met
/// ```
///
/// Requests that arrive with no matching expectation are answered with
/// [`FrameworkError::NotFound`] and counted; `verify` fails if any were seen.
pub struct MockClient<T: Document> {
    client: DocumentClient<T>,
    expectations: Expectations<T>,
    unexpected: Arc<Mutex<Vec<String>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: Document> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<DocumentRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let unexpected = Arc::new(Mutex::new(Vec::new()));
        let expectations_clone = expectations.clone();
        let unexpected_clone = unexpected.clone();

        // Spawn background task to answer requests
        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = expectations_clone
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();

                match (request, expectation) {
                    (DocumentRequest::Get { respond_to, .. }, Some(Expectation::Get { response })) => {
                        let _ = respond_to.send(response);
                    }
                    (DocumentRequest::Put { respond_to, .. }, Some(Expectation::Put { response })) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        DocumentRequest::Delete { respond_to, .. },
                        Some(Expectation::Delete { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (request, _) => {
                        let (label, key) = describe(&request);
                        unexpected_clone
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(format!("{label} {key}"));
                        reject(request, format!("unexpected {label} for {key}"));
                    }
                }
            }
        });

        Self {
            client: DocumentClient::new(sender),
            expectations,
            unexpected,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> DocumentClient<T> {
        self.client.clone()
    }

    /// Expects a `get` operation.
    pub fn expect_get(&mut self) -> GetExpectationBuilder<T> {
        GetExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `put` operation.
    pub fn expect_put(&mut self) -> OutcomeExpectationBuilder<T> {
        OutcomeExpectationBuilder {
            delete: false,
            expectations: self.expectations.clone(),
        }
    }

    /// Expects a `delete` operation.
    pub fn expect_delete(&mut self) -> OutcomeExpectationBuilder<T> {
        OutcomeExpectationBuilder {
            delete: true,
            expectations: self.expectations.clone(),
        }
    }

    /// Number of expectations not consumed yet.
    pub fn remaining(&self) -> usize {
        self.expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Verifies that all expectations were met and nothing unexpected arrived.
    ///
    /// # Panics
    /// Panics when expectations remain or unexpected requests were received.
    pub fn verify(&self) {
        let remaining = self.remaining();
        let unexpected = self
            .unexpected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        assert!(
            remaining == 0 && unexpected.is_empty(),
            "Not all expectations were met: {remaining} remaining, unexpected requests: {unexpected:?}"
        );
    }
}

impl<T: Document> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn describe<T: Document>(request: &DocumentRequest<T>) -> (&'static str, String) {
    match request {
        DocumentRequest::Get { key, .. } => ("get", key.to_string()),
        DocumentRequest::Put { key, .. } => ("put", key.to_string()),
        DocumentRequest::Delete { key, .. } => ("delete", key.to_string()),
    }
}

fn reject<T: Document>(request: DocumentRequest<T>, reason: String) {
    match request {
        DocumentRequest::Get { respond_to, .. } => {
            let _ = respond_to.send(Err(FrameworkError::NotFound(reason)));
        }
        DocumentRequest::Put { respond_to, .. } | DocumentRequest::Delete { respond_to, .. } => {
            let _ = respond_to.send(Err(FrameworkError::NotFound(reason)));
        }
    }
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder<T: Document> {
    expectations: Expectations<T>,
}

impl<T: Document> GetExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: Option<T>) {
        push(&self.expectations, Expectation::Get { response: Ok(value) });
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        push(&self.expectations, Expectation::Get { response: Err(error) });
    }
}

/// Builder for `put` and `delete` expectations.
pub struct OutcomeExpectationBuilder<T: Document> {
    delete: bool,
    expectations: Expectations<T>,
}

impl<T: Document> OutcomeExpectationBuilder<T> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, outcome: T::Outcome) {
        self.respond(Ok(outcome));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: FrameworkError) {
        self.respond(Err(error));
    }

    fn respond(self, response: Result<T::Outcome, FrameworkError>) {
        let expectation = if self.delete {
            Expectation::Delete { response }
        } else {
            Expectation::Put { response }
        };
        push(&self.expectations, expectation);
    }
}

// =============================================================================
// MANUAL HELPERS
// =============================================================================

/// Creates a client whose requests land on a receiver the test controls.
///
/// The test answers each request itself, which makes it possible to hold one request
/// while another is answered first (e.g. to reorder a save and a delete).
pub fn create_mock_client<T: Document>(
    buffer_size: usize,
) -> (DocumentClient<T>, mpsc::Receiver<DocumentRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (DocumentClient::new(sender), receiver)
}

/// Waits for the next request and returns it if it is a `get`.
pub async fn expect_get<T: Document>(
    receiver: &mut mpsc::Receiver<DocumentRequest<T>>,
) -> Option<(T::Key, Response<Option<T>>)> {
    match receiver.recv().await {
        Some(DocumentRequest::Get { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Waits for the next request and returns it if it is a `put`.
pub async fn expect_put<T: Document>(
    receiver: &mut mpsc::Receiver<DocumentRequest<T>>,
) -> Option<(T::Key, T::Put, Response<T::Outcome>)> {
    match receiver.recv().await {
        Some(DocumentRequest::Put {
            key,
            put,
            respond_to,
        }) => Some((key, put, respond_to)),
        _ => None,
    }
}

/// Waits for the next request and returns it if it is a `delete`.
pub async fn expect_delete<T: Document>(
    receiver: &mut mpsc::Receiver<DocumentRequest<T>>,
) -> Option<(T::Key, T::Delete, Response<T::Outcome>)> {
    match receiver.recv().await {
        Some(DocumentRequest::Delete {
            key,
            delete,
            respond_to,
        }) => Some((key, delete, respond_to)),
        _ => None,
    }
}
