//! # Validation Module
//!
//! Input validation for draft sales, catalog and customer edits, and report
//! ranges.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP handler, CLI, frontend)                          │
//! │  └── Type validation (deserialization into DraftSale / ProductInput)    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                        │
//! │  ├── Runs before any store is touched                                   │
//! │  └── Field names locate the offending value: items[2].quantity          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store                                                         │
//! │  ├── CHECK (quantity >= 0), NOT NULL                                    │
//! │  └── Conditional decrement (authoritative stock check)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::types::{DraftItem, DraftSale};
//! use stockroom_core::validation::validate_draft;
//!
//! let draft = DraftSale::new("c-1", vec![DraftItem::new("p-1", 3)]).with_discount(10.0);
//! let rate = validate_draft(&draft).unwrap();
//! assert_eq!(rate.bps(), 1000);
//! ```

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::types::{CustomerInput, DiscountRate, DraftSale, ProductInput};
use crate::{MAX_CUSTOMER_FIELD_LEN, MAX_PRODUCT_NAME_LEN, MAX_TAX_ID_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Draft Sale Validators
// =============================================================================

/// Validates a customer reference.
///
/// ## Rules
/// - Must not be empty after trimming
pub fn validate_customer(customer: &str) -> ValidationResult<()> {
    if customer.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "customer".to_string(),
        });
    }
    Ok(())
}

/// Validates a product, sale or customer id. `field` names it in the error.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a requested quantity.
///
/// ## Rules
/// - Must be positive (> 0)
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_quantity;
///
/// assert!(validate_quantity("quantity", 1).is_ok());
/// assert!(validate_quantity("quantity", 0).is_err());
/// assert!(validate_quantity("quantity", -5).is_err());
/// ```
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an optional discount percentage and converts it to basis points.
///
/// ## Rules
/// - Absent means no discount
/// - Must be a finite number (NaN and infinities rejected)
/// - Must be between 0 and 100 inclusive
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_discount_percent;
///
/// assert_eq!(validate_discount_percent(None).unwrap().bps(), 0);
/// assert_eq!(validate_discount_percent(Some(12.5)).unwrap().bps(), 1250);
/// assert!(validate_discount_percent(Some(100.01)).is_err());
/// assert!(validate_discount_percent(Some(f64::NAN)).is_err());
/// ```
pub fn validate_discount_percent(percent: Option<f64>) -> ValidationResult<DiscountRate> {
    let Some(percent) = percent else {
        return Ok(DiscountRate::zero());
    };

    if !percent.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: "discount_percent".to_string(),
            reason: "must be a finite number".to_string(),
        });
    }

    if !(0.0..=100.0).contains(&percent) {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent".to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(DiscountRate::from_percentage(percent))
}

/// Validates a whole draft sale and returns its discount rate.
///
/// Checks run in field order so the first error reported is the first
/// offending field: customer, items, each line, then the discount.
pub fn validate_draft(draft: &DraftSale) -> ValidationResult<DiscountRate> {
    validate_customer(&draft.customer)?;

    if draft.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    for (index, item) in draft.items.iter().enumerate() {
        validate_id(&format!("items[{index}].product_id"), &item.product_id)?;
        validate_quantity(&format!("items[{index}].quantity"), item.quantity)?;
    }

    validate_discount_percent(draft.discount_percent)
}

// =============================================================================
// Catalog Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Widget").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, MAX_PRODUCT_NAME_LEN)
}

/// Non-blank after trimming and at most `max` characters.
fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    validate_max_len(field, value, max)
}

fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a unit price in cents.
///
/// ## Rules
/// - Must be positive (free items are not sold through the catalog)
pub fn validate_price_cents(price_cents: i64) -> ValidationResult<()> {
    if price_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price_cents".to_string(),
        });
    }
    Ok(())
}

/// Validates a quantity-on-hand set directly through the catalog.
pub fn validate_stock_level(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates every field of a product create/edit request.
pub fn validate_product_input(input: &ProductInput) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_price_cents(input.price_cents)?;
    validate_stock_level(input.quantity)
}

/// Validates a restock amount.
pub fn validate_restock_amount(amount: i64) -> ValidationResult<()> {
    validate_quantity("amount", amount)
}

// =============================================================================
// Customer Validators
// =============================================================================

/// Validates an email address.
///
/// ## Rules
/// - Required, at most 200 characters
/// - One `@` with a non-empty local part before it
/// - A domain containing a dot, not starting or ending with one
/// - No whitespace
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_email;
///
/// assert!(validate_email("ana@example.com").is_ok());
/// assert!(validate_email("ana@localhost").is_err());
/// assert!(validate_email("ana example@x.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_required_text("email", email, MAX_CUSTOMER_FIELD_LEN)?;
    let email = email.trim();

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@domain.tld".to_string(),
        });
    }
    Ok(())
}

/// Validates every field of a customer create/edit request.
///
/// Name, email and tax id are required; phone and address may be absent.
pub fn validate_customer_input(input: &CustomerInput) -> ValidationResult<()> {
    validate_required_text("name", &input.name, MAX_CUSTOMER_FIELD_LEN)?;
    validate_email(&input.email)?;
    validate_required_text("tax_id", &input.tax_id, MAX_TAX_ID_LEN)?;

    if let Some(phone) = &input.phone {
        validate_max_len("phone", phone.trim(), MAX_CUSTOMER_FIELD_LEN)?;
    }
    if let Some(address) = &input.address {
        validate_max_len("address", address.trim(), MAX_CUSTOMER_FIELD_LEN)?;
    }
    Ok(())
}

// =============================================================================
// Query Validators
// =============================================================================

/// Validates an inclusive time range.
///
/// ## Rules
/// - `start` must not be after `end` (equal bounds select a single instant)
pub fn validate_period(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvertedRange {
            start_field: "start".to_string(),
            end_field: "end".to_string(),
        });
    }
    Ok(())
}

/// Validates a result limit for reports.
pub fn validate_limit(limit: u32) -> ValidationResult<()> {
    if limit == 0 {
        return Err(ValidationError::MustBePositive {
            field: "limit".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DraftItem;
    use chrono::Duration;

    fn draft() -> DraftSale {
        DraftSale::new("c-1", vec![DraftItem::new("p-1", 3)])
    }

    #[test]
    fn test_validate_customer() {
        assert!(validate_customer("c-1").is_ok());
        assert_eq!(
            validate_customer("   "),
            Err(ValidationError::Required {
                field: "customer".to_string()
            })
        );
    }

    #[test]
    fn test_validate_id_names_the_field() {
        assert!(validate_id("sale_id", "s-1").is_ok());
        assert_eq!(
            validate_id("sale_id", " "),
            Err(ValidationError::Required {
                field: "sale_id".to_string()
            })
        );
        assert_eq!(
            validate_id("customer_id", ""),
            Err(ValidationError::Required {
                field: "customer_id".to_string()
            })
        );
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", 1).is_ok());
        assert!(validate_quantity("quantity", 1_000_000).is_ok());
        assert!(validate_quantity("quantity", 0).is_err());
        assert!(validate_quantity("quantity", -1).is_err());
    }

    #[test]
    fn test_validate_discount_percent_bounds() {
        assert_eq!(validate_discount_percent(Some(0.0)).unwrap().bps(), 0);
        assert_eq!(validate_discount_percent(Some(100.0)).unwrap().bps(), 10_000);
        assert!(matches!(
            validate_discount_percent(Some(-0.5)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_discount_percent(Some(f64::INFINITY)),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_draft_ok() {
        let rate = validate_draft(&draft().with_discount(10.0)).unwrap();
        assert_eq!(rate.bps(), 1000);
    }

    #[test]
    fn test_validate_draft_rejects_empty_items() {
        let draft = DraftSale::new("c-1", vec![]);
        assert_eq!(
            validate_draft(&draft),
            Err(ValidationError::Empty {
                field: "items".to_string()
            })
        );
    }

    #[test]
    fn test_validate_draft_names_offending_line() {
        let draft = DraftSale::new(
            "c-1",
            vec![DraftItem::new("p-1", 1), DraftItem::new("p-2", 0)],
        );
        assert_eq!(
            validate_draft(&draft),
            Err(ValidationError::MustBePositive {
                field: "items[1].quantity".to_string()
            })
        );

        let draft = DraftSale::new("c-1", vec![DraftItem::new("", 1)]);
        assert_eq!(
            validate_draft(&draft),
            Err(ValidationError::Required {
                field: "items[0].product_id".to_string()
            })
        );
    }

    #[test]
    fn test_validate_draft_checks_customer_first() {
        let draft = DraftSale::new("", vec![]);
        assert!(matches!(
            validate_draft(&draft),
            Err(ValidationError::Required { field }) if field == "customer"
        ));
    }

    #[test]
    fn test_validate_product_input() {
        let input = ProductInput {
            name: "Widget".to_string(),
            description: None,
            price_cents: 1000,
            quantity: 0,
        };
        assert!(validate_product_input(&input).is_ok());

        let too_long = ProductInput {
            name: "x".repeat(MAX_PRODUCT_NAME_LEN + 1),
            ..input.clone()
        };
        assert!(matches!(
            validate_product_input(&too_long),
            Err(ValidationError::TooLong { .. })
        ));

        let free = ProductInput {
            price_cents: 0,
            ..input.clone()
        };
        assert!(validate_product_input(&free).is_err());

        let negative = ProductInput {
            quantity: -1,
            ..input
        };
        assert!(matches!(
            validate_product_input(&negative),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    fn customer_input() -> CustomerInput {
        CustomerInput {
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
            phone: None,
            address: Some("Rua A, 10".to_string()),
            tax_id: "123.456.789-00".to_string(),
        }
    }

    #[test]
    fn test_validate_customer_input() {
        assert!(validate_customer_input(&customer_input()).is_ok());

        let nameless = CustomerInput {
            name: " ".to_string(),
            ..customer_input()
        };
        assert!(matches!(
            validate_customer_input(&nameless),
            Err(ValidationError::Required { field }) if field == "name"
        ));

        let no_tax_id = CustomerInput {
            tax_id: String::new(),
            ..customer_input()
        };
        assert!(matches!(
            validate_customer_input(&no_tax_id),
            Err(ValidationError::Required { field }) if field == "tax_id"
        ));

        let long_address = CustomerInput {
            address: Some("x".repeat(MAX_CUSTOMER_FIELD_LEN + 1)),
            ..customer_input()
        };
        assert!(matches!(
            validate_customer_input(&long_address),
            Err(ValidationError::TooLong { field, .. }) if field == "address"
        ));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email(" ana.souza@mail.example.com ").is_ok());
        assert!(matches!(validate_email(""), Err(ValidationError::Required { .. })));
        for bad in ["ana", "@example.com", "ana@", "ana@example", "ana@.com", "ana@x.com.", "a@b@c.com"] {
            assert!(
                matches!(validate_email(bad), Err(ValidationError::InvalidFormat { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_validate_period() {
        let now = Utc::now();
        assert!(validate_period(now, now).is_ok());
        assert!(validate_period(now - Duration::hours(1), now).is_ok());
        assert!(matches!(
            validate_period(now, now - Duration::hours(1)),
            Err(ValidationError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_validate_restock_and_limit() {
        assert!(validate_restock_amount(5).is_ok());
        assert!(validate_restock_amount(0).is_err());
        assert!(validate_limit(1).is_ok());
        assert!(validate_limit(0).is_err());
    }
}
