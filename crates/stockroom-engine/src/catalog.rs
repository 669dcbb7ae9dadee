//! # Catalog Service
//!
//! Validated product management on top of [`ProductStore`].
//!
//! `update_product` sets quantity-on-hand directly, the one write to stock
//! that doesn't go through a conditional primitive. `restock_product` adds
//! to it with `increment` and leaves `updated_at` alone.

use std::sync::Arc;

use stockroom_core::validation::{validate_id, validate_product_input, validate_restock_amount};
use stockroom_core::{timestamp_now, Product, ProductInput};
use stockroom_db::{generate_product_id, ProductStore};
use tracing::{debug, info};

use crate::error::{SaleError, SaleResult};

/// Product CRUD with input validation.
#[derive(Clone)]
pub struct Catalog {
    products: Arc<dyn ProductStore>,
}

impl Catalog {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    /// Creates a product with a fresh UUID.
    pub async fn create_product(&self, input: &ProductInput) -> SaleResult<Product> {
        validate_product_input(input)?;

        let now = timestamp_now();
        let product = Product {
            id: generate_product_id(),
            name: input.name.trim().to_string(),
            description: clean_description(&input.description),
            price_cents: input.price_cents,
            quantity: input.quantity,
            created_at: now,
            updated_at: now,
        };
        self.products.insert(&product).await?;

        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> SaleResult<Product> {
        debug!(id = %id, "get_product");
        validate_id("product_id", id)?;
        self.products
            .get(id)
            .await?
            .ok_or_else(|| SaleError::not_found("Product", id))
    }

    /// All products ordered by name.
    pub async fn list_products(&self) -> SaleResult<Vec<Product>> {
        Ok(self.products.list().await?)
    }

    /// Replaces name, description, price and quantity. Keeps `created_at`.
    pub async fn update_product(&self, id: &str, input: &ProductInput) -> SaleResult<Product> {
        validate_product_input(input)?;
        let existing = self.get_product(id).await?;

        let product = Product {
            name: input.name.trim().to_string(),
            description: clean_description(&input.description),
            price_cents: input.price_cents,
            quantity: input.quantity,
            updated_at: timestamp_now(),
            ..existing
        };
        self.products.update(&product).await?;

        info!(product_id = %id, quantity = product.quantity, "Product updated");
        Ok(product)
    }

    /// Removes a product. Sales that sold it keep their captured prices.
    pub async fn delete_product(&self, id: &str) -> SaleResult<()> {
        validate_id("product_id", id)?;
        self.products.delete(id).await?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Adds `amount` units to stock and returns the product.
    ///
    /// A sum past `i64::MAX` is a validation error and stock is unchanged.
    pub async fn restock_product(&self, id: &str, amount: i64) -> SaleResult<Product> {
        validate_id("product_id", id)?;
        validate_restock_amount(amount)?;

        if self.products.increment(id, amount).await? == 0 {
            return Err(SaleError::not_found("Product", id));
        }

        info!(product_id = %id, amount, "Product restocked");
        self.get_product(id).await
    }
}

/// Blank descriptions are stored as absent.
fn clean_description(description: &Option<String>) -> Option<String> {
    description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Unit Tests
// =============================================================================
