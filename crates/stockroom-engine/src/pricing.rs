//! # Pricing Engine
//!
//! Resolves the products a draft references and prices it with the pure
//! functions in `stockroom_core::pricing`.
//!
//! ```text
//! DraftSale ──► validate_draft ──► ProductStore::get_many ──► price_sale ──► PricedSale
//!                  (no I/O)           (one batch read)          (pure)
//! ```
//!
//! Nothing here mutates stock. The stock check is an optimistic pre-check;
//! the conditional decrement in the coordinator is what actually holds.

use std::collections::HashMap;
use std::sync::Arc;

use stockroom_core::pricing;
use stockroom_core::validation::{validate_draft, validate_id};
use stockroom_core::{DraftSale, PricedSale, Product};
use stockroom_db::{ProductStore, SaleStore};
use tracing::debug;

use crate::error::{SaleError, SaleResult};

/// Prices drafts against the current catalog.
#[derive(Clone)]
pub struct PricingEngine {
    products: Arc<dyn ProductStore>,
    sales: Arc<dyn SaleStore>,
}

impl PricingEngine {
    pub fn new(products: Arc<dyn ProductStore>, sales: Arc<dyn SaleStore>) -> Self {
        Self { products, sales }
    }

    /// Prices a new sale.
    ///
    /// ## Errors
    /// - `Validation` for a malformed draft (checked before any read)
    /// - `NotFound` for an unknown product
    /// - `InsufficientStock` when a product has fewer units than requested
    pub async fn price_sale(&self, draft: &DraftSale) -> SaleResult<PricedSale> {
        validate_draft(draft)?;
        let catalog = self.resolve(draft).await?;
        let priced = pricing::price_sale(draft, &catalog)?;

        debug!(
            lines = priced.items.len(),
            total_cents = priced.total_cents,
            "Priced sale"
        );
        Ok(priced)
    }

    /// Prices a draft that will replace sale `sale_id`.
    ///
    /// The units the sale currently holds count as available, since the
    /// update restores them before decrementing the new lines.
    pub async fn price_replacement(&self, sale_id: &str, draft: &DraftSale) -> SaleResult<PricedSale> {
        validate_id("sale_id", sale_id)?;
        validate_draft(draft)?;

        if self.sales.get_header(sale_id).await?.is_none() {
            return Err(SaleError::not_found("Sale", sale_id));
        }

        let mut held: HashMap<String, i64> = HashMap::new();
        for item in self.sales.get_items(sale_id).await? {
            *held.entry(item.product_id).or_insert(0) += item.quantity;
        }

        let catalog = self.resolve(draft).await?;
        let priced = pricing::price_replacement(draft, &catalog, &held)?;

        debug!(
            sale_id = %sale_id,
            lines = priced.items.len(),
            total_cents = priced.total_cents,
            "Priced replacement"
        );
        Ok(priced)
    }

    /// Loads every distinct product the draft names.
    async fn resolve(&self, draft: &DraftSale) -> SaleResult<HashMap<String, Product>> {
        let mut ids: Vec<String> = draft.items.iter().map(|i| i.product_id.clone()).collect();
        ids.sort();
        ids.dedup();

        let products = self.products.get_many(&ids).await?;
        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
