#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # Catalog Sync
//!
//! > **Multi-locale product catalog with live prices and a persisted cart.**
//!
//! Three independently changing sources have to stay consistent for a browsing user:
//! - product identity split across a base record and per-locale translations,
//! - price, discount and stock fields mutated server-side at any time,
//! - a cart kept in memory, mirrored to durable per-user storage.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Owned stores, explicit handles
//! The cart ([`CartStore`](cart::CartStore)) and the live price map
//! ([`LiveUpdates`](live::LiveUpdates)) are small owned stores handed to consumers by
//! handle. There are no global singletons; every background task receives its inputs
//! through `watch`/`mpsc` channels and stops on a [`Shutdown`](lifecycle::Shutdown)
//! token.
//!
//! ### Last write wins, by version
//! Cart writes are stamped with a monotonic hybrid clock at mutation time. Storage keeps
//! the highest version it has seen (tombstones included), so network arrival order never
//! decides which write survives.
//!
//! ## 👩‍💻 Architecture Notes
//!
//! ### 1. Type-Safe Error Handling
//! Each component owns a `thiserror` enum ([`ResolveError`](locale::ResolveError),
//! [`FeedError`](live::FeedError), [`StorageError`](cart::StorageError), ...). Transient
//! failures are logged and retried; only catalog lookups propagate to callers.
//!
//! ### 2. Concurrency Model
//! The storage actor, the poller and the synchronizer each run in their own Tokio task.
//! The actor processes messages sequentially, which makes its compare-and-apply of
//! versions atomic without locks.
//!
//! ### 3. Observability
//! We use `tracing` everywhere with structured fields.
//! See the [`lifecycle::tracing`] module for details.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! The generic keyed [`DocumentActor`](framework::DocumentActor) and its mock client.
//!
//! ### 2. The Data ([`model`], [`catalog`])
//! Plain records and the catalog database contract.
//!
//! ### 3. The Core ([`locale`], [`live`], [`cart`])
//! - **Locale Resolver**: product + locale to a translated view, and sibling variants.
//! - **Update Feed Poller & Merge Engine**: the live overlay on product views.
//! - **Cart Store & Synchronizer**: the session cart and its debounced persistence.
//!
//! ### 4. The Interface ([`clients`], [`cart_storage_actor`])
//! The durable cart document and the typed client that exposes it as cart storage.
//!
//! ### 5. The Orchestrator ([`lifecycle`])
//! [`CatalogSystem`](lifecycle::CatalogSystem) wires everything and shuts it down in
//! order.
//!
//! ## 🚀 Quick Start
//!
//! ### Running the Demo
//!
//! ```bash
//! # Run with info logs
//! RUST_LOG=info cargo run
//!
//! # Persist carts to disk, fixed recommendation seed
//! RUST_LOG=info cargo run -- --cart-dir ./carts --recommendation-seed 7
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod cart;
pub mod cart_storage_actor;
pub mod catalog;
pub mod clients;
pub mod config;
pub mod framework;
pub mod lifecycle;
pub mod live;
pub mod locale;
pub mod model;
pub mod recommend;
