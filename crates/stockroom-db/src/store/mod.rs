//! # Store Abstraction
//!
//! The narrow persistence interface the engine is written against. Two
//! backings implement it: SQLite ([`crate::repository`]) and an in-memory
//! map ([`memory::MemoryStore`]) for tests and embedding.
//!
//! ## Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ProductStore                SaleStore                                  │
//! │  ├── get / list              ├── get_header / get_items                 │
//! │  ├── insert / update         ├── list_headers(SaleFilter)               │
//! │  ├── delete                  ├── items_for(sale ids)                    │
//! │  ├── conditional_decrement   ├── summary / top_products                 │
//! │  ├── increment               ├── monthly_totals                         │
//! │  └── low_stock               └── begin() ──► Box<dyn UnitOfWork>        │
//! │                                                  │                      │
//! │  CustomerStore                                   ▼                      │
//! │  ├── get_customer            UnitOfWork (one atomic unit)               │
//! │  ├── customer_by_tax_id      ├── claim_sale / insert_sale / ...         │
//! │  ├── list_customers          ├── conditional_decrement / increment      │
//! │  └── insert / update /       └── commit(self) / rollback(self)          │
//! │      delete_customer                                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules For Implementations
//! - Quantity-on-hand only changes through `conditional_decrement` and
//!   `increment` (plus catalog `update`). Nothing reads then writes it.
//! - `conditional_decrement` returns the number of rows changed: 1 when the
//!   product had at least `n` on hand, 0 otherwise.
//! - `increment` never wraps or widens: a sum past `i64::MAX` is
//!   `DbError::StockOverflow` and the quantity stays as it was.
//! - Report sums past `i64::MAX` fail with `QueryFailed("integer overflow")`.
//! - A unit of work dropped without `commit` is rolled back.
//! - While a unit of work is open, the same task must not call the
//!   non-transactional store methods; a backend may serialize on them.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stockroom_core::{Customer, LineItem, Product, SaleHeader};

use crate::error::DbResult;

// =============================================================================
// Filters and Aggregates
// =============================================================================

/// Which sales a listing returns. Results are ordered by `sold_at`, then id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleFilter {
    All,
    Customer(String),
    /// Inclusive on both ends.
    Period {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl SaleFilter {
    /// Checks whether a header passes the filter.
    pub fn matches(&self, header: &SaleHeader) -> bool {
        match self {
            SaleFilter::All => true,
            SaleFilter::Customer(customer) => header.customer == *customer,
            SaleFilter::Period { start, end } => header.sold_at >= *start && header.sold_at <= *end,
        }
    }
}

/// Aggregated sale amounts over a period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct SalesTotals {
    pub sale_count: i64,
    pub gross_cents: i64,
    pub discount_cents: i64,
    pub revenue_cents: i64,
}

/// Units and revenue of one product over a period.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ProductUnits {
    pub product_id: String,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

/// Count and revenue of one `YYYY-MM` month.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MonthlyTotals {
    pub month: String,
    pub sale_count: i64,
    pub revenue_cents: i64,
}

// =============================================================================
// Product Store
// =============================================================================

/// Product records and the atomic stock primitives.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get(&self, id: &str) -> DbResult<Option<Product>>;

    /// Fetches several products at once. Missing ids are skipped.
    async fn get_many(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.get(id).await? {
                products.push(product);
            }
        }
        Ok(products)
    }

    /// All products ordered by name.
    async fn list(&self) -> DbResult<Vec<Product>>;

    async fn insert(&self, product: &Product) -> DbResult<()>;

    /// Replaces every field except `id` and `created_at`.
    /// `NotFound` if the product doesn't exist.
    async fn update(&self, product: &Product) -> DbResult<()>;

    /// `NotFound` if the product doesn't exist.
    async fn delete(&self, id: &str) -> DbResult<()>;

    /// `quantity = quantity - n WHERE id = ? AND quantity >= n`.
    async fn conditional_decrement(&self, id: &str, n: i64) -> DbResult<u64>;

    /// `quantity = quantity + n WHERE id = ?`. 0 rows when the product is
    /// missing; `StockOverflow` (row untouched) when the sum leaves `i64`.
    async fn increment(&self, id: &str, n: i64) -> DbResult<u64>;

    /// Products with `quantity <= threshold`, lowest stock first.
    async fn low_stock(&self, threshold: i64, limit: u32) -> DbResult<Vec<Product>>;
}

// =============================================================================
// Sale Store
// =============================================================================

/// Sale reads and the entry point for atomic writes.
#[async_trait]
pub trait SaleStore: Send + Sync {
    async fn get_header(&self, id: &str) -> DbResult<Option<SaleHeader>>;

    /// Items of one sale ordered by position.
    async fn get_items(&self, sale_id: &str) -> DbResult<Vec<LineItem>>;

    async fn list_headers(&self, filter: &SaleFilter) -> DbResult<Vec<SaleHeader>>;

    /// Items of several sales, ordered by sale id then position.
    async fn items_for(&self, sale_ids: &[String]) -> DbResult<Vec<LineItem>>;

    /// Count and sums over sales with `sold_at` in `[start, end]`.
    async fn summary(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<SalesTotals>;

    /// Best sellers by units in `[start, end]`: units desc, revenue desc,
    /// product id asc.
    async fn top_products(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<ProductUnits>>;

    /// Sales in `[start, end]` grouped by the UTC month of `sold_at`, newest
    /// month first. Months without sales are absent.
    async fn monthly_totals(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<MonthlyTotals>>;

    /// Opens an atomic unit of work.
    async fn begin(&self) -> DbResult<Box<dyn UnitOfWork>>;
}

// =============================================================================
// Customer Store
// =============================================================================

/// Customer registry records.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>>;

    async fn customer_by_tax_id(&self, tax_id: &str) -> DbResult<Option<Customer>>;

    /// All customers ordered by name, then id.
    async fn list_customers(&self) -> DbResult<Vec<Customer>>;

    /// `UniqueViolation` if the id or tax id is taken.
    async fn insert_customer(&self, customer: &Customer) -> DbResult<()>;

    /// Replaces every field except `id` and `created_at`. `NotFound` if the
    /// customer doesn't exist, `UniqueViolation` if the new tax id is taken.
    async fn update_customer(&self, customer: &Customer) -> DbResult<()>;

    /// `NotFound` if the customer doesn't exist.
    async fn delete_customer(&self, id: &str) -> DbResult<()>;
}

// =============================================================================
// Unit of Work
// =============================================================================

/// One atomic unit spanning sale rows and stock changes.
///
/// Isolation is at least read-committed. Writers are serialized: the first
/// statement of every unit takes the write lock.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Locks the sale for writing and returns its header, or `None` if it
    /// doesn't exist.
    async fn claim_sale(&mut self, id: &str) -> DbResult<Option<SaleHeader>>;

    async fn insert_sale(&mut self, header: &SaleHeader) -> DbResult<()>;

    async fn update_sale(&mut self, header: &SaleHeader) -> DbResult<()>;

    async fn delete_sale(&mut self, id: &str) -> DbResult<()>;

    async fn sale_items(&mut self, sale_id: &str) -> DbResult<Vec<LineItem>>;

    async fn insert_item(&mut self, item: &LineItem) -> DbResult<()>;

    async fn delete_items(&mut self, sale_id: &str) -> DbResult<u64>;

    async fn conditional_decrement(&mut self, product_id: &str, n: i64) -> DbResult<u64>;

    /// Same contract as [`ProductStore::increment`].
    async fn increment(&mut self, product_id: &str, n: i64) -> DbResult<u64>;

    /// Quantity on hand as seen inside this unit.
    async fn stock_level(&mut self, product_id: &str) -> DbResult<Option<i64>>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
