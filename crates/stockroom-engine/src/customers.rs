//! # Customer Registry
//!
//! Validated customer records on top of [`CustomerStore`].
//!
//! ```text
//!   CustomerInput ──► validate_customer_input ──► tax id free? ──► insert
//!                                                     │
//!                                                     └─ taken ──► AlreadyExists
//! ```
//!
//! Sales name their customer with free text. Nothing here looks at sales,
//! and deleting a customer leaves every sale as it was.

use std::sync::Arc;

use stockroom_core::validation::{validate_customer_input, validate_id};
use stockroom_core::{timestamp_now, Customer, CustomerInput, ValidationError};
use stockroom_db::{generate_customer_id, CustomerStore};
use tracing::{debug, info};

use crate::error::{SaleError, SaleResult};

/// Customer CRUD with input validation.
#[derive(Clone)]
pub struct Customers {
    customers: Arc<dyn CustomerStore>,
}

impl Customers {
    pub fn new(customers: Arc<dyn CustomerStore>) -> Self {
        Self { customers }
    }

    /// Registers a customer with a fresh UUID. `created_at` is now.
    pub async fn create_customer(&self, input: &CustomerInput) -> SaleResult<Customer> {
        validate_customer_input(input)?;
        let fields = CleanInput::from(input);
        self.ensure_tax_id_free(&fields.tax_id, None).await?;

        let now = timestamp_now();
        let customer = Customer {
            id: generate_customer_id(),
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            tax_id: fields.tax_id,
            created_at: now,
            updated_at: now,
        };
        self.customers.insert_customer(&customer).await?;

        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, id: &str) -> SaleResult<Customer> {
        debug!(id = %id, "get_customer");
        validate_id("customer_id", id)?;
        self.customers
            .get_customer(id)
            .await?
            .ok_or_else(|| SaleError::not_found("Customer", id))
    }

    /// Looks a customer up by tax id, compared after trimming.
    pub async fn get_customer_by_tax_id(&self, tax_id: &str) -> SaleResult<Customer> {
        validate_id("tax_id", tax_id)?;
        let tax_id = tax_id.trim();
        self.customers
            .customer_by_tax_id(tax_id)
            .await?
            .ok_or_else(|| SaleError::not_found("Customer", tax_id))
    }

    /// All customers ordered by name.
    pub async fn list_customers(&self) -> SaleResult<Vec<Customer>> {
        Ok(self.customers.list_customers().await?)
    }

    /// Replaces every field. `created_at` stays as registered.
    pub async fn update_customer(&self, id: &str, input: &CustomerInput) -> SaleResult<Customer> {
        validate_customer_input(input)?;
        let existing = self.get_customer(id).await?;
        let fields = CleanInput::from(input);
        self.ensure_tax_id_free(&fields.tax_id, Some(id)).await?;

        let customer = Customer {
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            tax_id: fields.tax_id,
            updated_at: timestamp_now(),
            ..existing
        };
        self.customers.update_customer(&customer).await?;

        info!(customer_id = %id, "Customer updated");
        Ok(customer)
    }

    pub async fn delete_customer(&self, id: &str) -> SaleResult<()> {
        validate_id("customer_id", id)?;
        self.customers.delete_customer(id).await?;

        info!(customer_id = %id, "Customer deleted");
        Ok(())
    }

    /// A concurrent registration that passes this check still fails on the
    /// store's unique constraint.
    async fn ensure_tax_id_free(&self, tax_id: &str, owner: Option<&str>) -> SaleResult<()> {
        match self.customers.customer_by_tax_id(tax_id).await? {
            Some(holder) if Some(holder.id.as_str()) != owner => {
                Err(SaleError::Validation(ValidationError::AlreadyExists {
                    field: "tax_id".to_string(),
                    value: tax_id.to_string(),
                }))
            }
            _ => Ok(()),
        }
    }
}

/// Trimmed input. Blank phone and address are stored as absent.
struct CleanInput {
    name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    tax_id: String,
}

impl From<&CustomerInput> for CleanInput {
    fn from(input: &CustomerInput) -> Self {
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            phone: optional(&input.phone),
            address: optional(&input.address),
            tax_id: input.tax_id.trim().to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
