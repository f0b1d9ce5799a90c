//! Generic keyed document actor.
//!
//! This module provides the building blocks the durable cart storage is built on: a
//! [`Document`] trait with versioned write hooks, the [`DocumentActor`] that owns the
//! documents, and the [`DocumentClient`] used to talk to it.
//!
//! # Testing
//!
//! See [`mock`] module for utilities to test clients without spawning an actor.

pub mod core;
pub mod mock;

// Re-export core types for convenience
pub use core::*;
