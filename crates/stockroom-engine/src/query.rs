//! # Sale Queries
//!
//! Read paths that rebuild sale aggregates from headers and items.
//!
//! - [`SaleQueries::get_sale`] enriches each line with a snapshot of the
//!   product as it is now. A product deleted since the sale reads as the
//!   "product not found" placeholder instead of failing the read.
//! - The listings fetch items in one batch per listing and carry no
//!   product snapshots. They are ordered by `sold_at`, then id.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use stockroom_core::validation::{validate_customer, validate_period, validate_id};
use stockroom_core::{LineItem, Product, ProductSnapshot, Sale, SaleHeader, SaleLine};
use stockroom_db::{ProductStore, SaleFilter, SaleStore};
use tracing::{debug, warn};

use crate::error::{SaleError, SaleResult};

/// Sale read side.
#[derive(Clone)]
pub struct SaleQueries {
    products: Arc<dyn ProductStore>,
    sales: Arc<dyn SaleStore>,
}

impl SaleQueries {
    pub fn new(products: Arc<dyn ProductStore>, sales: Arc<dyn SaleStore>) -> Self {
        Self { products, sales }
    }

    /// One sale with its lines in order, each carrying a product snapshot.
    pub async fn get_sale(&self, id: &str) -> SaleResult<Sale> {
        validate_id("sale_id", id)?;

        let header = self
            .sales
            .get_header(id)
            .await?
            .ok_or_else(|| SaleError::not_found("Sale", id))?;
        let items = self.sales.get_items(id).await?;

        let snapshots = self.snapshots(&items).await;
        let lines = items
            .into_iter()
            .map(|item| {
                let product = snapshots.as_ref().map(|found| {
                    found
                        .get(&item.product_id)
                        .map(ProductSnapshot::from)
                        .unwrap_or_else(|| ProductSnapshot::not_found(&item.product_id))
                });
                SaleLine { item, product }
            })
            .collect();

        Ok(Sale {
            header,
            items: lines,
        })
    }

    pub async fn list_sales(&self) -> SaleResult<Vec<Sale>> {
        self.list(SaleFilter::All).await
    }

    pub async fn list_by_customer(&self, customer: &str) -> SaleResult<Vec<Sale>> {
        validate_customer(customer)?;
        self.list(SaleFilter::Customer(customer.trim().to_string())).await
    }

    /// Sales with `sold_at` in `[start, end]`.
    pub async fn list_by_period(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> SaleResult<Vec<Sale>> {
        validate_period(start, end)?;
        self.list(SaleFilter::Period { start, end }).await
    }

    async fn list(&self, filter: SaleFilter) -> SaleResult<Vec<Sale>> {
        let headers = self.sales.list_headers(&filter).await?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = headers.iter().map(|h| h.id.clone()).collect();
        let items = self.sales.items_for(&ids).await?;

        debug!(?filter, sales = headers.len(), items = items.len(), "Listed sales");
        Ok(assemble(headers, items))
    }

    /// Current products for the given lines. `None` when the lookup failed.
    async fn snapshots(&self, items: &[LineItem]) -> Option<HashMap<String, Product>> {
        let mut ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
        ids.sort();
        ids.dedup();

        match self.products.get_many(&ids).await {
            Ok(products) => Some(products.into_iter().map(|p| (p.id.clone(), p)).collect()),
            Err(err) => {
                warn!(error = %err, "Product lookup failed, returning sale without snapshots");
                None
            }
        }
    }
}

/// Groups items under their headers, keeping header order.
fn assemble(headers: Vec<SaleHeader>, items: Vec<LineItem>) -> Vec<Sale> {
    let mut by_sale: HashMap<String, Vec<LineItem>> = HashMap::new();
    for item in items {
        by_sale.entry(item.sale_id.clone()).or_default().push(item);
    }

    headers
        .into_iter()
        .map(|header| {
            let mut lines = by_sale.remove(&header.id).unwrap_or_default();
            lines.sort_by_key(|item| item.position);
            Sale::from_parts(header, lines)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
