//! Merge engine: overlays live price, discount and stock on a product view.
//!
//! Everything here is pure. Prices stay unrounded in every view; rounding happens only
//! in [`display_price`].

use super::LiveMap;
use crate::model::{ProductUpdate, ProductView};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

/// Combines `base` with its live update.
///
/// Returns `base` itself (same allocation) when there is no update, when the update
/// belongs to another product, or when it changes nothing. Otherwise returns a copy
/// whose delivered fields override the base. An undelivered field (`None`) keeps the
/// base value while `Some(0)` and `Some(false)` do override.
pub fn merge(base: &Arc<ProductView>, update: Option<&ProductUpdate>) -> Arc<ProductView> {
    let Some(update) = update.filter(|u| u.id == base.id) else {
        return Arc::clone(base);
    };

    let price = update.price.unwrap_or(base.price);
    let discount = update.discount.unwrap_or(base.discount);
    let in_stock = update.in_stock.unwrap_or(base.in_stock);

    if price == base.price && discount == base.discount && in_stock == base.in_stock {
        return Arc::clone(base);
    }

    let mut merged = ProductView::clone(base);
    merged.price = price;
    merged.discount = discount;
    merged.in_stock = in_stock;
    Arc::new(merged)
}

/// Merges every view against the same live map snapshot.
pub fn merge_all(views: &[Arc<ProductView>], live: &LiveMap) -> Vec<Arc<ProductView>> {
    views.iter().map(|view| merge(view, live.get(&view.id))).collect()
}

/// Price after discount, unrounded. The discount is clamped to `0..=100`.
pub fn effective_price(price: Decimal, discount: Decimal) -> Decimal {
    let discount = discount.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    if discount > Decimal::ZERO {
        price * (Decimal::ONE - discount / Decimal::ONE_HUNDRED)
    } else {
        price
    }
}

/// Price shown to the user: [`effective_price`] rounded to cents.
pub fn display_price(view: &ProductView) -> Decimal {
    round_for_display(effective_price(view.price, view.discount))
}

pub(crate) fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
