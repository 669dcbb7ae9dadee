//! # Sale Repository
//!
//! Database operations for sales and sale items, plus the SQLite unit of
//! work used by the transaction coordinator.
//!
//! ## Unit of Work Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Unit of Work Lifecycle                            │
//! │                                                                         │
//! │  begin()          pool.begin() → Transaction<'static, Sqlite>           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  first statement  INSERT INTO sales ...        (create)                 │
//! │     │             UPDATE sales SET id = id ... (update / delete claim)  │
//! │     │             → takes SQLite's write lock before any read, so the   │
//! │     │               transaction never has to upgrade a read snapshot    │
//! │     ▼                                                                   │
//! │  item rows + conditional decrements / increments                        │
//! │     │                                                                   │
//! │     ├── all ok ──► commit()                                             │
//! │     └── any err ─► rollback() (or drop → sqlx rolls back)               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use stockroom_core::{LineItem, SaleHeader};
use tracing::debug;
use uuid::Uuid;

use super::{db_time, increment_stock};
use crate::error::{DbError, DbResult};
use crate::store::{MonthlyTotals, ProductUnits, SaleFilter, SaleStore, SalesTotals, UnitOfWork};

const HEADER_COLUMNS: &str = "id, customer, sold_at, subtotal_cents, discount_bps, \
     discount_cents, total_cents, updated_at";

const ITEM_COLUMNS: &str =
    "id, sale_id, product_id, position, quantity, unit_price_cents, subtotal_cents";

/// Bind parameters per `IN (...)` batch.
const ID_BATCH: usize = 500;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Counts all sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl SaleStore for SaleRepository {
    async fn get_header(&self, id: &str) -> DbResult<Option<SaleHeader>> {
        let header = sqlx::query_as::<_, SaleHeader>(&format!(
            "SELECT {HEADER_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(header)
    }

    async fn get_items(&self, sale_id: &str) -> DbResult<Vec<LineItem>> {
        let items = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY position"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn list_headers(&self, filter: &SaleFilter) -> DbResult<Vec<SaleHeader>> {
        debug!(?filter, "Listing sales");

        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {HEADER_COLUMNS} FROM sales"));
        match filter {
            SaleFilter::All => {}
            SaleFilter::Customer(customer) => {
                query.push(" WHERE customer = ").push_bind(customer.clone());
            }
            SaleFilter::Period { start, end } => {
                query
                    .push(" WHERE sold_at BETWEEN ")
                    .push_bind(db_time(start))
                    .push(" AND ")
                    .push_bind(db_time(end));
            }
        }
        query.push(" ORDER BY sold_at, id");

        let headers = query
            .build_query_as::<SaleHeader>()
            .fetch_all(&self.pool)
            .await?;

        Ok(headers)
    }

    async fn items_for(&self, sale_ids: &[String]) -> DbResult<Vec<LineItem>> {
        let mut items = Vec::new();

        for batch in sale_ids.chunks(ID_BATCH) {
            let mut query = QueryBuilder::<Sqlite>::new(format!(
                "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id IN ("
            ));
            let mut ids = query.separated(", ");
            for id in batch {
                ids.push_bind(id.clone());
            }
            ids.push_unseparated(") ORDER BY sale_id, position");

            items.extend(
                query
                    .build_query_as::<LineItem>()
                    .fetch_all(&self.pool)
                    .await?,
            );
        }

        Ok(items)
    }

    async fn summary(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<SalesTotals> {
        let totals = sqlx::query_as::<_, SalesTotals>(
            r#"
            SELECT
                COUNT(*)                          AS sale_count,
                COALESCE(SUM(subtotal_cents), 0)  AS gross_cents,
                COALESCE(SUM(discount_cents), 0)  AS discount_cents,
                COALESCE(SUM(total_cents), 0)     AS revenue_cents
            FROM sales
            WHERE sold_at BETWEEN ?1 AND ?2
            "#,
        )
        .bind(db_time(&start))
        .bind(db_time(&end))
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }

    async fn top_products(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<ProductUnits>> {
        let ranked = sqlx::query_as::<_, ProductUnits>(
            r#"
            SELECT
                i.product_id           AS product_id,
                SUM(i.quantity)        AS units_sold,
                SUM(i.subtotal_cents)  AS revenue_cents
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            WHERE s.sold_at BETWEEN ?1 AND ?2
            GROUP BY i.product_id
            ORDER BY units_sold DESC, revenue_cents DESC, i.product_id
            LIMIT ?3
            "#,
        )
        .bind(db_time(&start))
        .bind(db_time(&end))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(ranked)
    }

    async fn monthly_totals(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> DbResult<Vec<MonthlyTotals>> {
        // sold_at is `YYYY-MM-DDT...Z`, so the first seven characters are the UTC month.
        let months = sqlx::query_as::<_, MonthlyTotals>(
            r#"
            SELECT
                substr(sold_at, 1, 7)  AS month,
                COUNT(*)               AS sale_count,
                SUM(total_cents)       AS revenue_cents
            FROM sales
            WHERE sold_at BETWEEN ?1 AND ?2
            GROUP BY month
            ORDER BY month DESC
            "#,
        )
        .bind(db_time(&start))
        .bind(db_time(&end))
        .fetch_all(&self.pool)
        .await?;

        Ok(months)
    }

    async fn begin(&self) -> DbResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.map_err(DbError::transaction)?;
        debug!("Began SQLite unit of work");
        Ok(Box::new(SqliteUnitOfWork { tx }))
    }
}

// =============================================================================
// Unit of Work
// =============================================================================

/// A sqlx transaction exposing the per-row primitives the coordinator needs.
pub struct SqliteUnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn claim_sale(&mut self, id: &str) -> DbResult<Option<SaleHeader>> {
        // No-op write: takes the write lock and tells us whether the row exists.
        let claimed = sqlx::query("UPDATE sales SET id = id WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if claimed.rows_affected() == 0 {
            return Ok(None);
        }

        let header = sqlx::query_as::<_, SaleHeader>(&format!(
            "SELECT {HEADER_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(header)
    }

    async fn insert_sale(&mut self, header: &SaleHeader) -> DbResult<()> {
        debug!(sale_id = %header.id, customer = %header.customer, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, customer, sold_at,
                subtotal_cents, discount_bps, discount_cents, total_cents,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&header.id)
        .bind(&header.customer)
        .bind(db_time(&header.sold_at))
        .bind(header.subtotal_cents)
        .bind(header.discount_bps)
        .bind(header.discount_cents)
        .bind(header.total_cents)
        .bind(db_time(&header.updated_at))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_sale(&mut self, header: &SaleHeader) -> DbResult<()> {
        debug!(sale_id = %header.id, "Updating sale header");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                customer = ?2,
                sold_at = ?3,
                subtotal_cents = ?4,
                discount_bps = ?5,
                discount_cents = ?6,
                total_cents = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&header.id)
        .bind(&header.customer)
        .bind(db_time(&header.sold_at))
        .bind(header.subtotal_cents)
        .bind(header.discount_bps)
        .bind(header.discount_cents)
        .bind(header.total_cents)
        .bind(db_time(&header.updated_at))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", &header.id));
        }

        Ok(())
    }

    async fn delete_sale(&mut self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }

        Ok(())
    }

    async fn sale_items(&mut self, sale_id: &str) -> DbResult<Vec<LineItem>> {
        let items = sqlx::query_as::<_, LineItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY position"
        ))
        .bind(sale_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(items)
    }

    async fn insert_item(&mut self, item: &LineItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, position, quantity, unit_price_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.position)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.subtotal_cents)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_items(&mut self, sale_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn conditional_decrement(&mut self, product_id: &str, n: i64) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE products SET quantity = quantity - ?2 WHERE id = ?1 AND quantity >= ?2",
        )
        .bind(product_id)
        .bind(n)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn increment(&mut self, product_id: &str, n: i64) -> DbResult<u64> {
        increment_stock(&mut *self.tx, product_id, n).await
    }

    async fn stock_level(&mut self, product_id: &str) -> DbResult<Option<i64>> {
        let quantity: Option<i64> = sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(quantity)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx.commit().await.map_err(DbError::transaction)?;
        debug!("Committed SQLite unit of work");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.tx.rollback().await.map_err(DbError::transaction)?;
        debug!("Rolled back SQLite unit of work");
        Ok(())
    }
}

/// Helper to generate a new sale or line item ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
