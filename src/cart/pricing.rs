//! Prices cart lines against merged product views.

use super::CartState;
use crate::live::merge::round_for_display;
use crate::live::{effective_price, merge, LiveMap};
use crate::model::{ProductId, ProductView};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// One cart line with the live-merged view it was priced from.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub view: Arc<ProductView>,
    pub quantity: u32,
    /// Discounted unit price, unrounded.
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Priced cart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSummary {
    pub lines: Vec<PricedLine>,
    /// Cart lines whose product could not be resolved. Kept in the cart, not priced.
    pub unresolved: Vec<ProductId>,
    pub total_items: u64,
    /// Sum of line totals, unrounded.
    pub subtotal: Decimal,
}

impl CartSummary {
    /// Prices `cart` with `views` overlaid by `live`.
    pub fn build(cart: &CartState, views: &HashMap<ProductId, Arc<ProductView>>, live: &LiveMap) -> Self {
        let mut summary = CartSummary {
            total_items: cart.total_items(),
            ..Default::default()
        };

        for (id, &quantity) in &cart.lines {
            let Some(view) = views.get(id) else {
                summary.unresolved.push(id.clone());
                continue;
            };
            let view = merge(view, live.get(id));
            let unit_price = effective_price(view.price, view.discount);
            let line_total = unit_price * Decimal::from(quantity);
            summary.subtotal += line_total;
            summary.lines.push(PricedLine {
                view,
                quantity,
                unit_price,
                line_total,
            });
        }
        summary
    }

    /// Subtotal rounded to cents for display.
    pub fn display_subtotal(&self) -> Decimal {
        round_for_display(self.subtotal)
    }

    /// Lines whose product is currently out of stock.
    pub fn out_of_stock(&self) -> impl Iterator<Item = &PricedLine> {
        self.lines.iter().filter(|line| !line.view.in_stock)
    }
}
