//! # Pricing Module
//!
//! Turns a validated [`DraftSale`] into a [`PricedSale`] using product data
//! the caller already resolved. Pure: no store access, no clock.
//!
//! ## Pricing Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DraftSale ──► validate_draft ──► DiscountRate                          │
//! │      │                                                                  │
//! │      ▼  for each line (in order)                                        │
//! │  catalog[product_id] ──► missing? ──► ProductNotFound                   │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  requested so far for product  >  on hand + credit ?                    │
//! │      │                                 └──► InsufficientStock           │
//! │      ▼                                                                  │
//! │  subtotal = quantity × current unit price                               │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  Σ subtotals ──► discount_of(rate) ──► total = subtotal − discount      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check here is advisory. The conditional decrement at commit time
//! is what actually guarantees stock never goes negative.

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DraftSale, PricedItem, PricedSale, Product};
use crate::validation::validate_draft;

/// Prices a draft sale against the current catalog.
///
/// ## Example
/// ```rust
/// use std::collections::HashMap;
/// use stockroom_core::pricing::price_sale;
/// use stockroom_core::types::{DraftItem, DraftSale, Product};
///
/// let now = chrono::Utc::now();
/// let product = Product {
///     id: "p-1".into(),
///     name: "Widget".into(),
///     description: None,
///     price_cents: 1000,
///     quantity: 5,
///     created_at: now,
///     updated_at: now,
/// };
/// let catalog = HashMap::from([(product.id.clone(), product)]);
///
/// let draft = DraftSale::new("c-1", vec![DraftItem::new("p-1", 3)]).with_discount(10.0);
/// let priced = price_sale(&draft, &catalog).unwrap();
/// assert_eq!(priced.subtotal_cents, 3000);
/// assert_eq!(priced.total_cents, 2700);
/// ```
pub fn price_sale(draft: &DraftSale, catalog: &HashMap<String, Product>) -> CoreResult<PricedSale> {
    price_with_credits(draft, catalog, &HashMap::new())
}

/// Prices a draft that will replace an existing sale.
///
/// `held` maps product id to the quantity the existing sale currently holds.
/// Those units are restored inside the same unit of work before the new
/// lines are decremented, so they count as available here.
pub fn price_replacement(
    draft: &DraftSale,
    catalog: &HashMap<String, Product>,
    held: &HashMap<String, i64>,
) -> CoreResult<PricedSale> {
    price_with_credits(draft, catalog, held)
}

fn price_with_credits(
    draft: &DraftSale,
    catalog: &HashMap<String, Product>,
    credits: &HashMap<String, i64>,
) -> CoreResult<PricedSale> {
    let rate = validate_draft(draft)?;

    let mut requested: HashMap<&str, i64> = HashMap::new();
    let mut items = Vec::with_capacity(draft.items.len());
    let mut subtotal = Money::zero();

    for (index, line) in draft.items.iter().enumerate() {
        let product = catalog
            .get(&line.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

        let so_far = requested.entry(line.product_id.as_str()).or_insert(0);
        *so_far = so_far.checked_add(line.quantity).ok_or_else(|| overflow(index, "quantity"))?;

        let credit = credits.get(&line.product_id).copied().unwrap_or(0);
        let available = product.quantity.saturating_add(credit);
        if *so_far > available {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                available,
                requested: *so_far,
            });
        }

        let line_subtotal = product
            .price()
            .checked_multiply_quantity(line.quantity)
            .ok_or_else(|| overflow(index, "subtotal"))?;
        subtotal = subtotal
            .checked_add(line_subtotal)
            .ok_or_else(|| ValidationError::Overflow {
                field: "subtotal".to_string(),
            })?;

        items.push(PricedItem {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: line.quantity,
            unit_price_cents: product.price_cents,
            subtotal_cents: line_subtotal.cents(),
        });
    }

    let discount = subtotal.discount_of(rate);
    let total = subtotal - discount;

    Ok(PricedSale {
        customer: draft.customer.trim().to_string(),
        items,
        subtotal_cents: subtotal.cents(),
        discount_bps: rate.bps(),
        discount_cents: discount.cents(),
        total_cents: total.cents(),
    })
}

fn overflow(index: usize, what: &str) -> ValidationError {
    ValidationError::Overflow {
        field: format!("items[{index}].{what}"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
