//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, check, write back                                      │
//! │     SELECT quantity ...; (check in Rust); UPDATE ... SET quantity = 2   │
//! │     Two sales can both read 5 and both write 2.                         │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta in one statement                         │
//! │     UPDATE products SET quantity = quantity - 3                         │
//! │     WHERE id = ? AND quantity >= 3                                      │
//! │     rows_affected() == 0  →  not enough stock (or no such product)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use sqlx::SqlitePool;
use stockroom_core::Product;
use tracing::debug;
use uuid::Uuid;

use super::{db_time, increment_stock};
use crate::error::{DbError, DbResult};
use crate::store::ProductStore;

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, quantity, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Counts all products (for diagnostics and the seed tool).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(())` - Inserted
    /// * `Err(DbError::UniqueViolation)` - id already exists
    async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_cents, quantity, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(db_time(&product.created_at))
        .bind(db_time(&product.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing product. `created_at` is never touched.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                quantity = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(db_time(&product.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Hard-deletes a product. Sale items keep their captured price and
    /// read a placeholder afterwards.
    async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    async fn conditional_decrement(&self, id: &str, n: i64) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE products SET quantity = quantity - ?2 WHERE id = ?1 AND quantity >= ?2",
        )
        .bind(id)
        .bind(n)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, n, rows = result.rows_affected(), "Conditional decrement");
        Ok(result.rows_affected())
    }

    async fn increment(&self, id: &str, n: i64) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let rows = increment_stock(&mut *conn, id, n).await?;

        debug!(id = %id, n, rows, "Increment");
        Ok(rows)
    }

    async fn low_stock(&self, threshold: i64, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE quantity <= ?1 ORDER BY quantity, name, id LIMIT ?2"
        ))
        .bind(threshold)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}

/// Helper to generate a new product ID.
///
/// ## Usage
/// ```rust,ignore
/// let id = generate_product_id();
/// let product = Product { id, ... };
/// ```
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::timestamp_now;

    fn product(name: &str, quantity: i64) -> Product {
        let now = timestamp_now();
        Product {
            id: generate_product_id(),
            name: name.to_string(),
            description: Some(format!("{name} description")),
            price_cents: 1000,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    async fn repo() -> ProductRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let repo = repo().await;
        let widget = product("Widget", 5);
        repo.insert(&widget).await.unwrap();

        let stored = repo.get(&widget.id).await.unwrap().unwrap();
        assert_eq!(stored, widget);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_unique_violation() {
        let repo = repo().await;
        let widget = product("Widget", 5);
        repo.insert(&widget).await.unwrap();

        assert!(matches!(
            repo.insert(&widget).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let repo = repo().await;
        let widget = product("Widget", 5);
        repo.insert(&widget).await.unwrap();

        let edited = Product {
            name: "Gadget".to_string(),
            quantity: 9,
            created_at: widget.created_at + chrono::Duration::days(3),
            updated_at: widget.updated_at + chrono::Duration::seconds(1),
            ..widget.clone()
        };
        repo.update(&edited).await.unwrap();

        let stored = repo.get(&widget.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Gadget");
        assert_eq!(stored.quantity, 9);
        assert_eq!(stored.created_at, widget.created_at);
        assert_eq!(stored.updated_at, edited.updated_at);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let repo = repo().await;
        assert!(matches!(
            repo.update(&product("Ghost", 1)).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(repo.delete("nope").await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_conditional_decrement_never_goes_negative() {
        let repo = repo().await;
        let widget = product("Widget", 5);
        repo.insert(&widget).await.unwrap();

        assert_eq!(repo.conditional_decrement(&widget.id, 3).await.unwrap(), 1);
        assert_eq!(repo.conditional_decrement(&widget.id, 3).await.unwrap(), 0);
        assert_eq!(repo.conditional_decrement(&widget.id, 2).await.unwrap(), 1);
        assert_eq!(repo.get(&widget.id).await.unwrap().unwrap().quantity, 0);

        assert_eq!(repo.increment(&widget.id, 4).await.unwrap(), 1);
        assert_eq!(repo.get(&widget.id).await.unwrap().unwrap().quantity, 4);
        assert_eq!(repo.increment("missing", 4).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_past_i64_max_leaves_row_untouched() {
        let repo = repo().await;
        let widget = product("Widget", 5);
        repo.insert(&widget).await.unwrap();

        assert!(matches!(
            repo.increment(&widget.id, i64::MAX).await,
            Err(DbError::StockOverflow { ref product_id, amount })
                if *product_id == widget.id && amount == i64::MAX
        ));
        assert_eq!(repo.get(&widget.id).await.unwrap().unwrap().quantity, 5);

        // Exactly reaching the maximum is allowed.
        assert_eq!(repo.increment(&widget.id, i64::MAX - 5).await.unwrap(), 1);
        assert_eq!(repo.get(&widget.id).await.unwrap().unwrap().quantity, i64::MAX);
        assert!(matches!(
            repo.increment(&widget.id, 1).await,
            Err(DbError::StockOverflow { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_and_low_stock() {
        let repo = repo().await;
        let cherry = product("Cherry", 3);
        let apple = product("Apple", 12);
        let banana = product("Banana", 0);
        for p in [&cherry, &apple, &banana] {
            repo.insert(p).await.unwrap();
        }

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Apple", "Banana", "Cherry"]);

        let low: Vec<String> = repo
            .low_stock(10, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(low, vec!["Banana"]);
    }
}
