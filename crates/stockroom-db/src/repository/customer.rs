//! # Customer Repository
//!
//! Database operations for the customer registry.
//!
//! The tax id carries a UNIQUE constraint. A second registration with the
//! same tax id fails inside SQLite with `UNIQUE constraint failed:
//! customers.tax_id`, which arrives here as [`DbError::UniqueViolation`].

use async_trait::async_trait;
use sqlx::SqlitePool;
use stockroom_core::Customer;
use tracing::debug;
use uuid::Uuid;

use super::db_time;
use crate::error::{DbError, DbResult};
use crate::store::CustomerStore;

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, tax_id, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }
}

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn get_customer(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn customer_by_tax_id(&self, tax_id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE tax_id = ?1"
        ))
        .bind(tax_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn list_customers(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    async fn insert_customer(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, email, phone, address, tax_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.tax_id)
        .bind(db_time(&customer.created_at))
        .bind(db_time(&customer.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates an existing customer. `created_at` is never touched.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Customer doesn't exist
    /// * `Err(DbError::UniqueViolation)` - Tax id belongs to another customer
    async fn update_customer(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2,
                email = ?3,
                phone = ?4,
                address = ?5,
                tax_id = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.tax_id)
        .bind(db_time(&customer.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        Ok(())
    }

    async fn delete_customer(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        Ok(())
    }
}

/// Helper to generate a new customer ID.
pub fn generate_customer_id() -> String {
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

    fn customer(name: &str, tax_id: &str) -> Customer {
        let now = timestamp_now();
        Customer {
            id: generate_customer_id(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: Some("+55 11 5555-0100".to_string()),
            address: None,
            tax_id: tax_id.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    async fn repo() -> CustomerRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.customers()
    }

    #[tokio::test]
    async fn test_insert_and_lookups() {
        let repo = repo().await;
        let ana = customer("Ana", "111");
        repo.insert_customer(&ana).await.unwrap();

        assert_eq!(repo.get_customer(&ana.id).await.unwrap(), Some(ana.clone()));
        assert_eq!(repo.customer_by_tax_id("111").await.unwrap(), Some(ana));
        assert!(repo.customer_by_tax_id("999").await.unwrap().is_none());
        assert!(repo.get_customer("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_tax_id_is_unique_violation() {
        let repo = repo().await;
        repo.insert_customer(&customer("Ana", "111")).await.unwrap();

        assert!(matches!(
            repo.insert_customer(&customer("Bia", "111")).await,
            Err(DbError::UniqueViolation { ref field, .. }) if field == "customers.tax_id"
        ));

        let bia = customer("Bia", "222");
        repo.insert_customer(&bia).await.unwrap();
        let stealing = Customer {
            tax_id: "111".to_string(),
            ..bia
        };
        assert!(matches!(
            repo.update_customer(&stealing).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let repo = repo().await;
        let ana = customer("Ana", "111");
        repo.insert_customer(&ana).await.unwrap();

        let edited = Customer {
            email: "ana.souza@example.com".to_string(),
            address: Some("Rua A, 10".to_string()),
            created_at: ana.created_at + chrono::Duration::days(3),
            updated_at: ana.updated_at + chrono::Duration::seconds(1),
            ..ana.clone()
        };
        repo.update_customer(&edited).await.unwrap();

        let stored = repo.get_customer(&ana.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "ana.souza@example.com");
        assert_eq!(stored.address.as_deref(), Some("Rua A, 10"));
        assert_eq!(stored.created_at, ana.created_at);
        assert_eq!(stored.updated_at, edited.updated_at);
    }

    #[tokio::test]
    async fn test_list_order_and_delete() {
        let repo = repo().await;
        let carla = customer("Carla", "333");
        let ana = customer("Ana", "111");
        repo.insert_customer(&carla).await.unwrap();
        repo.insert_customer(&ana).await.unwrap();

        let names: Vec<String> = repo
            .list_customers()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Ana", "Carla"]);

        repo.delete_customer(&ana.id).await.unwrap();
        assert!(matches!(
            repo.delete_customer(&ana.id).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            repo.update_customer(&ana).await,
            Err(DbError::NotFound { .. })
        ));
        assert_eq!(repo.list_customers().await.unwrap().len(), 1);
    }
}
