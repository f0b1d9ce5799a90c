use crate::cart::{CartDocument, CartStorage, StorageError, WriteOutcome};
use crate::cart_storage_actor::StoredCart;
use crate::clients::actor_client::ActorClient;
use crate::framework::{DocumentClient, FrameworkError};
use crate::model::{UserId, Version};
use async_trait::async_trait;

/// Client for the cart storage actor. Implements [`CartStorage`].
#[derive(Clone)]
pub struct CartStorageClient {
    inner: DocumentClient<StoredCart>,
}

impl CartStorageClient {
    pub fn new(inner: DocumentClient<StoredCart>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ActorClient<StoredCart> for CartStorageClient {
    type Error = StorageError;

    fn inner(&self) -> &DocumentClient<StoredCart> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        StorageError::Backend(e.to_string())
    }
}

#[async_trait]
impl CartStorage for CartStorageClient {
    async fn load(&self, user: &UserId) -> Result<Option<CartDocument>, StorageError> {
        let stored = self.get_document(user.clone()).await?;
        Ok(stored.map(|cart| cart.to_document()))
    }

    async fn save(&self, user: &UserId, document: CartDocument) -> Result<WriteOutcome, StorageError> {
        self.put_document(user.clone(), document).await
    }

    async fn delete(&self, user: &UserId, version: Version) -> Result<WriteOutcome, StorageError> {
        self.delete_document(user.clone(), version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::MockClient;
    use crate::model::CartLine;

    #[tokio::test]
    async fn test_actor_failures_become_backend_errors() {
        let mut mock = MockClient::<StoredCart>::new();
        mock.expect_get().return_err(FrameworkError::ActorClosed);
        mock.expect_put().return_ok(WriteOutcome::Applied);

        let client = CartStorageClient::new(mock.client());
        let user = UserId::from("alice");

        let result = client.load(&user).await;
        assert!(matches!(result, Err(StorageError::Backend(_))));

        let document = CartDocument::new(vec![CartLine::new("a", 1)], Version(1));
        assert_eq!(client.save(&user, document).await.unwrap(), WriteOutcome::Applied);

        mock.verify();
    }
}
