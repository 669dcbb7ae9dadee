//! # In-Memory Store
//!
//! A map-backed implementation of [`ProductStore`], [`SaleStore`],
//! [`CustomerStore`] and [`UnitOfWork`]. Used by tests and by callers that embed the engine without
//! a database file.
//!
//! ## Concurrency Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  MemoryStore ── Arc<tokio::sync::Mutex<MemoryState>>                    │
//! │       │                                                                 │
//! │       ├── plain reads/writes: lock, act, unlock                         │
//! │       │                                                                 │
//! │       └── begin(): lock_owned() ──► MemoryUnitOfWork                    │
//! │                                     ├── guard   (held until end)        │
//! │                                     └── working (clone of state)        │
//! │                                          │                              │
//! │                        commit ──► *guard = working                      │
//! │                        rollback / drop ──► working discarded            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Units are serialized per store: a second `begin()` waits until the first
//! unit commits or rolls back.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stockroom_core::{Customer, LineItem, Product, SaleHeader};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::{
    CustomerStore, MonthlyTotals, ProductStore, ProductUnits, SaleFilter, SaleStore, SalesTotals,
    UnitOfWork,
};
use crate::error::{DbError, DbResult};

// =============================================================================
// State
// =============================================================================

/// Everything the store holds. Cloneable and comparable so tests can take
/// a snapshot before an operation and compare after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    pub products: BTreeMap<String, Product>,
    pub sales: BTreeMap<String, SaleHeader>,
    /// Line items per sale id, kept in position order.
    pub items: BTreeMap<String, Vec<LineItem>>,
    pub customers: BTreeMap<String, Customer>,
}

impl MemoryState {
    fn conditional_decrement(&mut self, id: &str, n: i64) -> u64 {
        match self.products.get_mut(id) {
            Some(product) if product.quantity >= n => {
                product.quantity -= n;
                1
            }
            _ => 0,
        }
    }

    fn increment(&mut self, id: &str, n: i64) -> DbResult<u64> {
        let Some(product) = self.products.get_mut(id) else {
            return Ok(0);
        };
        product.quantity = product
            .quantity
            .checked_add(n)
            .ok_or_else(|| DbError::stock_overflow(id, n))?;
        Ok(1)
    }

    /// True when a customer other than `except_id` holds `tax_id`.
    fn tax_id_taken(&self, tax_id: &str, except_id: &str) -> bool {
        self.customers
            .values()
            .any(|c| c.tax_id == tax_id && c.id != except_id)
    }

    fn headers_in(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> impl Iterator<Item = &SaleHeader> {
        let period = SaleFilter::Period { start, end };
        self.sales.values().filter(move |h| period.matches(h))
    }
}

/// What SQLite reports when `SUM` leaves the `i64` range.
fn integer_overflow() -> DbError {
    DbError::QueryFailed("integer overflow".to_string())
}

// =============================================================================
// Store
// =============================================================================

/// Shared in-memory store. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a store with the given products already in the catalog.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let state = MemoryState {
            products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Copy of the whole state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(id).cloned())
    }

    async fn list(&self) -> DbResult<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn insert(&self, product: &Product) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.products.contains_key(&product.id) {
            return Err(DbError::duplicate("products.id", product.id.clone()));
        }
        state.products.insert(product.id.clone(), product.clone());
        debug!(product_id = %product.id, "Inserted product");
        Ok(())
    }

    async fn update(&self, product: &Product) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let existing = state
            .products
            .get_mut(&product.id)
            .ok_or_else(|| DbError::not_found("Product", product.id.clone()))?;
        let created_at = existing.created_at;
        *existing = Product {
            created_at,
            ..product.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: &str) -> DbResult<()> {
        let mut state = self.state.lock().await;
        state
            .products
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    async fn conditional_decrement(&self, id: &str, n: i64) -> DbResult<u64> {
        Ok(self.state.lock().await.conditional_decrement(id, n))
    }

    async fn increment(&self, id: &str, n: i64) -> DbResult<u64> {
        self.state.lock().await.increment(id, n)
    }

    async fn low_stock(&self, threshold: i64, limit: u32) -> DbResult<Vec<Product>> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.quantity <= threshold)
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            a.quantity
                .cmp(&b.quantity)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        products.truncate(limit as usize);
        Ok(products)
    }
}

#[async_trait]
impl SaleStore for MemoryStore {
    async fn get_header(&self, id: &str) -> DbResult<Option<SaleHeader>> {
        Ok(self.state.lock().await.sales.get(id).cloned())
    }

    async fn get_items(&self, sale_id: &str) -> DbResult<Vec<LineItem>> {
        Ok(self
            .state
            .lock()
            .await
            .items
            .get(sale_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_headers(&self, filter: &SaleFilter) -> DbResult<Vec<SaleHeader>> {
        let state = self.state.lock().await;
        let mut headers: Vec<SaleHeader> = state
            .sales
            .values()
            .filter(|h| filter.matches(h))
            .cloned()
            .collect();
        headers.sort_by(|a, b| a.sold_at.cmp(&b.sold_at).then_with(|| a.id.cmp(&b.id)));
        Ok(headers)
    }

    async fn items_for(&self, sale_ids: &[String]) -> DbResult<Vec<LineItem>> {
        let wanted: HashSet<&str> = sale_ids.iter().map(String::as_str).collect();
        let state = self.state.lock().await;
        Ok(state
            .items
            .iter()
            .filter(|(sale_id, _)| wanted.contains(sale_id.as_str()))
            .flat_map(|(_, items)| items.iter().cloned())
            .collect())
    }

    async fn summary(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<SalesTotals> {
        let state = self.state.lock().await;
        let totals = state
            .headers_in(start, end)
            .try_fold(SalesTotals::default(), |totals, header| {
                Some(SalesTotals {
                    sale_count: totals.sale_count + 1,
                    gross_cents: totals.gross_cents.checked_add(header.subtotal_cents)?,
                    discount_cents: totals.discount_cents.checked_add(header.discount_cents)?,
                    revenue_cents: totals.revenue_cents.checked_add(header.total_cents)?,
                })
            })
            .ok_or_else(integer_overflow);
        totals
    }

    async fn top_products(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<ProductUnits>> {
        let state = self.state.lock().await;
        let mut by_product: HashMap<&str, (i64, i64)> = HashMap::new();
        for header in state.headers_in(start, end) {
            for item in state.items.get(&header.id).into_iter().flatten() {
                let entry = by_product.entry(item.product_id.as_str()).or_insert((0, 0));
                *entry = entry
                    .0
                    .checked_add(item.quantity)
                    .zip(entry.1.checked_add(item.subtotal_cents))
                    .ok_or_else(integer_overflow)?;
            }
        }

        let mut ranked: Vec<ProductUnits> = by_product
            .into_iter()
            .map(|(product_id, (units_sold, revenue_cents))| ProductUnits {
                product_id: product_id.to_string(),
                units_sold,
                revenue_cents,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.units_sold
                .cmp(&a.units_sold)
                .then_with(|| b.revenue_cents.cmp(&a.revenue_cents))
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn monthly_totals(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<MonthlyTotals>> {
        let state = self.state.lock().await;
        let mut by_month: BTreeMap<String, (i64, i64)> = BTreeMap::new();
        for header in state.headers_in(start, end) {
            let entry = by_month
                .entry(header.sold_at.format("%Y-%m").to_string())
                .or_insert((0, 0));
            *entry = (
                entry.0 + 1,
                entry.1.checked_add(header.total_cents).ok_or_else(integer_overflow)?,
            );
        }

        Ok(by_month
            .into_iter()
            .rev()
            .map(|(month, (sale_count, revenue_cents))| MonthlyTotals {
                month,
                sale_count,
                revenue_cents,
            })
            .collect())
    }

    async fn begin(&self) -> DbResult<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        debug!("Began in-memory unit of work");
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        Ok(self.state.lock().await.customers.get(id).cloned())
    }

    async fn customer_by_tax_id(&self, tax_id: &str) -> DbResult<Option<Customer>> {
        let state = self.state.lock().await;
        Ok(state.customers.values().find(|c| c.tax_id == tax_id).cloned())
    }

    async fn list_customers(&self) -> DbResult<Vec<Customer>> {
        let state = self.state.lock().await;
        let mut customers: Vec<Customer> = state.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(customers)
    }

    async fn insert_customer(&self, customer: &Customer) -> DbResult<()> {
        let mut state = self.state.lock().await;
        if state.customers.contains_key(&customer.id) {
            return Err(DbError::duplicate("customers.id", customer.id.clone()));
        }
        if state.tax_id_taken(&customer.tax_id, &customer.id) {
            return Err(DbError::duplicate("customers.tax_id", customer.tax_id.clone()));
        }
        state.customers.insert(customer.id.clone(), customer.clone());
        debug!(customer_id = %customer.id, "Inserted customer");
        Ok(())
    }

    async fn update_customer(&self, customer: &Customer) -> DbResult<()> {
        let mut state = self.state.lock().await;
        let created_at = state
            .customers
            .get(&customer.id)
            .map(|existing| existing.created_at)
            .ok_or_else(|| DbError::not_found("Customer", customer.id.clone()))?;
        if state.tax_id_taken(&customer.tax_id, &customer.id) {
            return Err(DbError::duplicate("customers.tax_id", customer.tax_id.clone()));
        }
        state.customers.insert(
            customer.id.clone(),
            Customer {
                created_at,
                ..customer.clone()
            },
        );
        Ok(())
    }

    async fn delete_customer(&self, id: &str) -> DbResult<()> {
        let mut state = self.state.lock().await;
        state
            .customers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Customer", id))
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

/// Holds the store lock for its whole lifetime and edits a private copy.
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn claim_sale(&mut self, id: &str) -> DbResult<Option<SaleHeader>> {
        Ok(self.working.sales.get(id).cloned())
    }

    async fn insert_sale(&mut self, header: &SaleHeader) -> DbResult<()> {
        if self.working.sales.contains_key(&header.id) {
            return Err(DbError::duplicate("sales.id", header.id.clone()));
        }
        self.working.sales.insert(header.id.clone(), header.clone());
        Ok(())
    }

    async fn update_sale(&mut self, header: &SaleHeader) -> DbResult<()> {
        let existing = self
            .working
            .sales
            .get_mut(&header.id)
            .ok_or_else(|| DbError::not_found("Sale", header.id.clone()))?;
        *existing = header.clone();
        Ok(())
    }

    async fn delete_sale(&mut self, id: &str) -> DbResult<()> {
        self.working.items.remove(id);
        self.working
            .sales
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    async fn sale_items(&mut self, sale_id: &str) -> DbResult<Vec<LineItem>> {
        Ok(self.working.items.get(sale_id).cloned().unwrap_or_default())
    }

    async fn insert_item(&mut self, item: &LineItem) -> DbResult<()> {
        if !self.working.sales.contains_key(&item.sale_id) {
            return Err(DbError::ForeignKeyViolation {
                message: format!("sale {} does not exist", item.sale_id),
            });
        }
        let items = self.working.items.entry(item.sale_id.clone()).or_default();
        let at = items.partition_point(|existing| existing.position <= item.position);
        items.insert(at, item.clone());
        Ok(())
    }

    async fn delete_items(&mut self, sale_id: &str) -> DbResult<u64> {
        Ok(self
            .working
            .items
            .remove(sale_id)
            .map_or(0, |items| items.len() as u64))
    }

    async fn conditional_decrement(&mut self, product_id: &str, n: i64) -> DbResult<u64> {
        Ok(self.working.conditional_decrement(product_id, n))
    }

    async fn increment(&mut self, product_id: &str, n: i64) -> DbResult<u64> {
        self.working.increment(product_id, n)
    }

    async fn stock_level(&mut self, product_id: &str) -> DbResult<Option<i64>> {
        Ok(self.working.products.get(product_id).map(|p| p.quantity))
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        debug!("Committed in-memory unit of work");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        debug!("Rolled back in-memory unit of work");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
