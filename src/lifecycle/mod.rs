//! Runtime orchestration: startup, shutdown and observability.

pub mod catalog_system;
pub mod shutdown;
pub mod tracing;

pub use catalog_system::*;
pub use shutdown::*;
pub use self::tracing::setup_tracing;
