//! # Cart
//!
//! The in-memory [`CartStore`], the durable [`CartStorage`] contract with its JSON file
//! backend, and the [`CartSynchronizer`] keeping the two in step.

pub mod clock;
pub mod error;
pub mod file_storage;
pub mod pricing;
pub mod storage;
pub mod store;
pub mod sync;

pub use clock::*;
pub use error::*;
pub use file_storage::*;
pub use pricing::*;
pub use storage::*;
pub use store::*;
pub use sync::*;
