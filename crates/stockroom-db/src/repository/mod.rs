//! # Repository Module
//!
//! SQLite implementations of the store traits.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  SalesEngine                                                            │
//! │       │                                                                 │
//! │       │  Arc<dyn ProductStore | SaleStore | CustomerStore>              │
//! │       ▼                                                                 │
//! │  ProductRepository                 SaleRepository                       │
//! │  ├── get / list / low_stock        ├── get_header / list_headers        │
//! │  ├── insert / update / delete      ├── summary / top_products           │
//! │  └── conditional_decrement         └── begin() ──► SqliteUnitOfWork     │
//! │       │                                               │                 │
//! │       │  SQL Query                                    │ Transaction     │
//! │       ▼                                               ▼                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and stock primitives
//! - [`SaleRepository`](sale::SaleRepository) - Sale reads, reports, units of work
//! - [`CustomerRepository`](customer::CustomerRepository) - Customer registry
//!
//! Queries are runtime-checked (`sqlx::query` / `query_as` with `FromRow`).

pub mod customer;
pub mod product;
pub mod sale;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqliteConnection;

use crate::error::{DbError, DbResult};

/// Formats a timestamp the way every TEXT timestamp column stores it:
/// RFC 3339, UTC, fixed microsecond precision. Fixed width keeps
/// lexicographic order equal to chronological order.
pub(crate) fn db_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `quantity = quantity + n` for one product, on a pool connection or
/// inside a transaction.
///
/// The `WHERE` guard keeps the sum inside `i64`; without it SQLite would
/// promote the column to REAL. Returns 1 when the row changed and 0 when
/// the product does not exist. An existing product whose sum would
/// overflow is `StockOverflow`.
pub(crate) async fn increment_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    n: i64,
) -> DbResult<u64> {
    let result = sqlx::query(
        "UPDATE products SET quantity = quantity + ?2 WHERE id = ?1 AND quantity <= ?3 - ?2",
    )
    .bind(product_id)
    .bind(n)
    .bind(i64::MAX)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = ?1)")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;
        if exists {
            return Err(DbError::stock_overflow(product_id, n));
        }
    }

    Ok(result.rows_affected())
}
