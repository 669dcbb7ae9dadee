//! # Error Types
//!
//! Failures the pure layer can report. Neither type knows about stores;
//! `stockroom-engine` folds both into `SaleError` next to the store's
//! `DbError`.
//!
//! ```text
//!   ValidationError ──(#[from])──► CoreError ──► SaleError ◄── DbError
//!   (bad input,                    (pricing:       (engine)      (db)
//!    nothing read yet)              unknown id,
//!                                   short stock)
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule failures raised while pricing a draft sale.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A draft line references a product the catalog doesn't have.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A replacement was priced for a sale id with no header.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// The draft asks for more units of a product than are on hand.
    ///
    /// `requested` is the total over every line naming the product, so two
    /// lines of 3 against 5 on hand report `available: 5, requested: 6`.
    #[error(
        "Insufficient stock for {product_name} ({product_id}): available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// The draft was rejected before pricing.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Rejected input. Raised before any store is touched, so a validation
/// failure never causes a write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    /// A sale with no lines.
    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A value that parses but means nothing, such as a NaN percentage.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A report period whose start lies after its end.
    #[error("{start_field} must not be after {end_field}")]
    InvertedRange {
        start_field: String,
        end_field: String,
    },

    /// Line or sale totals, or a restocked quantity, would not fit in `i64`.
    #[error("{field} is too large to compute")]
    Overflow { field: String },

    /// A value that must be unique is already taken, such as a customer's
    /// tax id.
    #[error("{field} '{value}' already exists")]
    AlreadyExists { field: String, value: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
