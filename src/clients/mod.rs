//! Type-safe wrappers around [`DocumentClient`](crate::framework::DocumentClient).

pub mod actor_client;
pub mod cart_storage_client;

pub use actor_client::*;
pub use cart_storage_client::*;
