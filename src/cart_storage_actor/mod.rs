//! Durable cart storage served by a [`DocumentActor`].

pub mod entity;
pub mod error;

pub use entity::*;
pub use error::*;

use crate::clients::CartStorageClient;
use crate::framework::DocumentActor;

/// Creates a cart storage actor and its client.
pub fn new(buffer_size: usize) -> (DocumentActor<StoredCart>, CartStorageClient) {
    let (actor, generic_client) = DocumentActor::new(buffer_size);
    (actor, CartStorageClient::new(generic_client))
}
