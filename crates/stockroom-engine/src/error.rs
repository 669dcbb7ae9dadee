//! # Sale Errors
//!
//! The one error type callers of the engine see.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockroom                              │
//! │                                                                         │
//! │  ValidationError ──┐                                                    │
//! │                    ├──► CoreError ──┐                                   │
//! │  pricing checks ───┘                │                                   │
//! │                                     ├──► SaleError ──► ErrorKind        │
//! │  DbError::NotFound ─────────────────┤        │          (status code)   │
//! │  DbError::StockOverflow / Unique ───┤        │                          │
//! │  DbError::* (everything else) ──────┘        ▼                          │
//! │                                         ErrorResponse { code, message } │
//! │                                                                         │
//! │  Kind               Caller's move                                       │
//! │  ─────────────────  ───────────────────────────────────────────────     │
//! │  Validation         fix the request, never retry as is                  │
//! │  NotFound           product or sale id is wrong                         │
//! │  InsufficientStock  resubmit with a smaller quantity                    │
//! │  Transaction        datastore trouble, retrying may succeed             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;
use thiserror::Error;
use ts_rs::TS;

/// Engine operation errors.
#[derive(Debug, Error)]
pub enum SaleError {
    /// The request is malformed. Raised before any unit of work opens.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A product or sale id doesn't exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Not enough stock, found either while pricing or by the conditional
    /// decrement at commit time.
    #[error(
        "Insufficient stock for {product_name} ({product_id}): available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// The datastore failed. The unit of work was rolled back.
    #[error("Transaction failed: {0}")]
    Transaction(#[source] DbError),
}

/// Coarse classification of a [`SaleError`] for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Input validation failed (400)
    Validation,
    /// Product or sale not found (404)
    NotFound,
    /// Not enough stock (409)
    InsufficientStock,
    /// Datastore failure (503)
    Transaction,
}

impl ErrorKind {
    /// The HTTP status a web layer would usually answer with.
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::InsufficientStock => 409,
            ErrorKind::Transaction => 503,
        }
    }
}

impl SaleError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        SaleError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SaleError::Validation(_) => ErrorKind::Validation,
            SaleError::NotFound { .. } => ErrorKind::NotFound,
            SaleError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            SaleError::Transaction(_) => ErrorKind::Transaction,
        }
    }

    /// Whether resubmitting the same request unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SaleError::Transaction(_))
    }
}

/// Converts core errors to sale errors.
impl From<CoreError> for SaleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => SaleError::not_found("Product", id),
            CoreError::SaleNotFound(id) => SaleError::not_found("Sale", id),
            CoreError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            } => SaleError::InsufficientStock {
                product_id,
                product_name,
                available,
                requested,
            },
            CoreError::Validation(err) => SaleError::Validation(err),
        }
    }
}

/// Converts database errors to sale errors.
///
/// `NotFound` keeps its meaning. A stock sum past `i64::MAX` and a taken
/// unique value are the caller's input, so they become validation errors.
/// Every other store failure is a transaction failure from the caller's
/// point of view.
impl From<DbError> for SaleError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SaleError::NotFound { entity, id },
            DbError::StockOverflow { product_id, amount } => {
                tracing::warn!(%product_id, amount, "Stock increment would overflow");
                SaleError::Validation(ValidationError::Overflow {
                    field: "quantity".to_string(),
                })
            }
            DbError::UniqueViolation { field, value } => {
                SaleError::Validation(ValidationError::AlreadyExists { field, value })
            }
            other => SaleError::Transaction(other),
        }
    }
}

// =============================================================================
// Serialized Form
// =============================================================================

/// What a web layer sends back when an engine call fails.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for Widget (p-1): available 5, requested 6" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorKind,

    /// Human-readable error message for display
    pub message: String,
}

impl From<&SaleError> for ErrorResponse {
    fn from(err: &SaleError) -> Self {
        let message = match err {
            // Store details stay in the logs.
            SaleError::Transaction(inner) => {
                tracing::error!(error = %inner, "Sale transaction failed");
                "Database transaction failed".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse {
            code: err.kind(),
            message,
        }
    }
}

/// Result type for engine operations.
pub type SaleResult<T> = Result<T, SaleError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_kinds() {
        let err: SaleError = CoreError::ProductNotFound("p-1".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Product not found: p-1");

        let err: SaleError = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            product_name: "Widget".to_string(),
            available: 5,
            requested: 6,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(!err.is_retryable());

        let err: SaleError = CoreError::Validation(ValidationError::Empty {
            field: "items".to_string(),
        })
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_db_errors_map_to_kinds() {
        let err: SaleError = DbError::not_found("Sale", "s-1").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: SaleError = DbError::PoolExhausted.into();
        assert_eq!(err.kind(), ErrorKind::Transaction);
        assert!(err.is_retryable());

        let err: SaleError = DbError::stock_overflow("p-1", i64::MAX).into();
        assert!(matches!(
            err,
            SaleError::Validation(ValidationError::Overflow { ref field }) if field == "quantity"
        ));
        assert!(!err.is_retryable());

        let err: SaleError = DbError::duplicate("customers.tax_id", "123").into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::Validation.status_code(), 400);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::InsufficientStock.status_code(), 409);
        assert_eq!(ErrorKind::Transaction.status_code(), 503);
    }

    #[test]
    fn test_error_response_serialization() {
        let err = SaleError::not_found("Sale", "s-1");
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Sale not found: s-1");

        let err = SaleError::Transaction(DbError::QueryFailed("disk I/O error".to_string()));
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, ErrorKind::Transaction);
        assert!(!response.message.contains("disk"));
    }
}
