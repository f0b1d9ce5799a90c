//! In-memory cart for the current session.

use super::VersionClock;
use crate::model::{CartLine, ProductId, Version};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Who caused a cart change. Only `Local` changes are written back to storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// The user edited the cart.
    #[default]
    Local,
    /// The cart was adopted from storage or reset on an identity change.
    Remote,
    /// The cart was cleared because a payment completed.
    Settlement,
}

/// Snapshot of the cart.
///
/// Every quantity in `lines` is strictly positive. `version` is the version of the
/// mutation that produced this state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub lines: BTreeMap<ProductId, u32>,
    pub version: Version,
    pub origin: ChangeOrigin,
}

impl CartState {
    pub fn total_items(&self) -> u64 {
        self.lines.values().map(|&q| u64::from(q)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn to_lines(&self) -> Vec<CartLine> {
        self.lines
            .iter()
            .map(|(id, &quantity)| CartLine::new(id.clone(), quantity))
            .collect()
    }
}

/// The authoritative cart of the session: `ProductId -> quantity`.
///
/// Mutations apply synchronously and are visible to every reader immediately.
/// Subscribers are notified only for mutations that actually change the cart, and
/// each such mutation is stamped with a fresh version from the shared clock.
#[derive(Debug, Clone)]
pub struct CartStore {
    state: Arc<watch::Sender<CartState>>,
    clock: Arc<VersionClock>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(VersionClock::new()))
    }

    pub fn with_clock(clock: Arc<VersionClock>) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            state: Arc::new(state),
            clock,
        }
    }

    /// Adjusts the quantity of `id` by `delta` and returns the new quantity.
    ///
    /// A result of zero or less removes the line. A negative delta on a missing line
    /// is a no-op.
    pub fn add(&self, id: impl Into<ProductId>, delta: i64) -> u32 {
        let id = id.into();
        let mut result = 0;
        self.state.send_if_modified(|state| {
            let current = state.lines.get(&id).copied().unwrap_or(0);
            let next = (i64::from(current) + delta).clamp(0, i64::from(u32::MAX));
            let next = u32::try_from(next).unwrap_or(u32::MAX);
            result = next;
            if next == current {
                return false;
            }
            if next == 0 {
                state.lines.remove(&id);
            } else {
                state.lines.insert(id.clone(), next);
            }
            state.version = self.clock.tick();
            state.origin = ChangeOrigin::Local;
            true
        });
        debug!(product_id = %id, delta, quantity = result, "Cart add");
        result
    }

    /// Removes the line for `id`. Returns whether it existed.
    pub fn remove(&self, id: &ProductId) -> bool {
        let removed = self.state.send_if_modified(|state| {
            if state.lines.remove(id).is_none() {
                return false;
            }
            state.version = self.clock.tick();
            state.origin = ChangeOrigin::Local;
            true
        });
        debug!(product_id = %id, removed, "Cart remove");
        removed
    }

    /// Empties the cart.
    pub fn clear(&self) {
        self.state.send_if_modified(|state| {
            if state.lines.is_empty() {
                return false;
            }
            state.lines.clear();
            state.version = self.clock.tick();
            state.origin = ChangeOrigin::Local;
            true
        });
        debug!("Cart cleared");
    }

    pub fn quantity(&self, id: &ProductId) -> u32 {
        self.state.borrow().lines.get(id).copied().unwrap_or(0)
    }

    /// Sum of all quantities, computed on every call.
    pub fn total_items(&self) -> u64 {
        self.state.borrow().total_items()
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.state.borrow().to_lines()
    }

    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    pub(crate) fn clock(&self) -> &Arc<VersionClock> {
        &self.clock
    }

    /// Replaces the whole cart on behalf of the synchronizer.
    ///
    /// Zero quantities are dropped. Subscribers are notified even if the lines are
    /// unchanged, since the version and origin move.
    pub(crate) fn replace(&self, lines: impl IntoIterator<Item = CartLine>, version: Version, origin: ChangeOrigin) {
        let lines: BTreeMap<ProductId, u32> = lines
            .into_iter()
            .filter(|line| line.quantity > 0)
            .map(|line| (line.product_id, line.quantity))
            .collect();
        self.state.send_replace(CartState {
            lines,
            version,
            origin,
        });
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_subtract_removes_the_line() {
        let cart = CartStore::new();
        cart.add("x", 1);
        assert_eq!(cart.add("x", -1), 0);
        assert!(cart.lines().is_empty());

        let other = CartStore::new();
        other.add("x", 1);
        other.remove(&"x".into());
        assert_eq!(cart.snapshot().lines, other.snapshot().lines);
    }

    #[test]
    fn total_items_sums_quantities() {
        let cart = CartStore::new();
        cart.add("a", 2);
        cart.add("b", 3);
        assert_eq!(cart.total_items(), 5);
    }

    #[test]
    fn quantities_never_drop_below_one() {
        let cart = CartStore::new();
        assert_eq!(cart.add("a", -3), 0);
        assert!(cart.lines().is_empty());

        cart.add("a", 2);
        assert_eq!(cart.add("a", -5), 0);
        assert_eq!(cart.quantity(&"a".into()), 0);
        assert!(cart.snapshot().lines.values().all(|&q| q > 0));
    }

    #[test]
    fn only_real_changes_bump_the_version() {
        let cart = CartStore::new();
        let mut changes = cart.subscribe();

        cart.add("a", 1);
        let version = cart.snapshot().version;
        assert!(changes.has_changed().unwrap());
        changes.borrow_and_update();

        cart.add("a", 0);
        cart.remove(&"missing".into());
        assert!(!changes.has_changed().unwrap());
        assert_eq!(cart.snapshot().version, version);

        cart.clear();
        assert!(cart.snapshot().version > version);
        assert_eq!(cart.snapshot().origin, ChangeOrigin::Local);
    }

    #[test]
    fn replace_drops_zero_lines() {
        let cart = CartStore::new();
        cart.replace(
            vec![CartLine::new("a", 2), CartLine::new("b", 0)],
            Version(7),
            ChangeOrigin::Remote,
        );
        let state = cart.snapshot();
        assert_eq!(state.to_lines(), vec![CartLine::new("a", 2)]);
        assert_eq!(state.version, Version(7));
        assert_eq!(state.origin, ChangeOrigin::Remote);
    }
}
