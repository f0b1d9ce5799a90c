//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by
//! `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Lifecycle** (`info`): storage actor, poller and synchronizer start and stop,
//!   cart loads, post-payment clears.
//! - **Operations** (`debug`): resolver lookups, live map refreshes, debounced saves.
//! - **Degradation** (`warn`): failed feed refreshes, failed cart loads, saves and
//!   deletes, duplicate translations.
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle only
//! RUST_LOG=info cargo run
//!
//! # Every refresh, save and lookup
//! RUST_LOG=debug cargo run
//!
//! # Only the cart synchronizer
//! RUST_LOG=catalog_sync::cart=debug cargo run
//! ```
//!
//! Client wrappers are annotated with `#[instrument]`, so at `debug` storage calls
//! also show up as spans carrying the key. A typical session at `info`:
//!
//! ```text
//! INFO Actor started document_type="StoredCart"
//! INFO Loading cart user_id=alice
//! INFO Cart loaded user_id=alice lines=2 version=v1760000000000
//! INFO Put done document_type="StoredCart" key=alice outcome=Applied size=1
//! WARN Cart write failed, will retry user_id=alice error=...
//! ```

/// Installs the global subscriber. Call once, at startup.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // Structured fields already carry the context
        .compact()
        .init();
}
