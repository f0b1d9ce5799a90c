use crate::framework::{Document, DocumentClient, FrameworkError};
use async_trait::async_trait;

/// Trait for document-specific clients to inherit the standard operations.
///
/// Implementors supply the inner [`DocumentClient`] and an error mapping; the
/// request plumbing and tracing come for free.
#[async_trait]
pub trait ActorClient<T: Document>: Send + Sync {
    /// The document-specific error type.
    type Error: Send + Sync;

    /// Access the inner generic DocumentClient.
    fn inner(&self) -> &DocumentClient<T>;

    /// Map framework errors to the specific error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Fetch a live document by key.
    #[tracing::instrument(skip(self))]
    async fn get_document(&self, key: T::Key) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(key).await.map_err(Self::map_error)
    }

    /// Write a document.
    #[tracing::instrument(skip(self))]
    async fn put_document(&self, key: T::Key, put: T::Put) -> Result<T::Outcome, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().put(key, put).await.map_err(Self::map_error)
    }

    /// Delete a document.
    #[tracing::instrument(skip(self))]
    async fn delete_document(&self, key: T::Key, delete: T::Delete) -> Result<T::Outcome, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().delete(key, delete).await.map_err(Self::map_error)
    }
}
