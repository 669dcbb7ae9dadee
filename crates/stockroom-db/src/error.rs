//! # Store Errors
//!
//! One error type for both store backends. The SQLite repositories convert
//! `sqlx` failures into it; the in-memory store builds the same variants by
//! hand so the engine cannot tell the two apart.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  sqlx::Error ──┐                                                        │
//! │                ├──► DbError ──► SaleError (stockroom-engine)            │
//! │  MemoryStore ──┘        │          NotFound      → NOT_FOUND            │
//! │                         │          StockOverflow → VALIDATION_ERROR     │
//! │                         │          otherwise     → TRANSACTION_FAILED   │
//! │                         ▼                                               │
//! │               constraint failures are classified from the               │
//! │               SQLite message ("UNIQUE ...", "FOREIGN KEY ...")          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Failure of a store call or unit of work.
#[derive(Debug, Error)]
pub enum DbError {
    /// The product or sale id has no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A product or sale id was inserted twice.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Adding to a product's stock would leave the `i64` range. The row is
    /// left unchanged.
    #[error("Stock overflow for product {product_id}: adding {amount} exceeds the largest quantity")]
    StockOverflow { product_id: String, amount: i64 },

    /// A line item points at a sale header that is not there.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The database file could not be opened or the pool is shut down.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQL ran and SQLite rejected it (CHECK constraint, locked file, ...).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin, commit or rollback of a unit of work failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Result type for store calls.
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn stock_overflow(product_id: impl Into<String>, amount: i64) -> Self {
        DbError::StockOverflow {
            product_id: product_id.into(),
            amount,
        }
    }

    /// Wraps a failed begin, commit or rollback.
    pub fn transaction(err: sqlx::Error) -> Self {
        DbError::TransactionFailed(err.to_string())
    }

    /// Classifies a message reported by SQLite itself.
    fn from_sqlite_message(msg: &str) -> Self {
        const UNIQUE: &str = "UNIQUE constraint failed: ";

        if let Some(column) = msg.strip_prefix(UNIQUE) {
            // SQLite names the column (`sales.id`) but not the value.
            DbError::duplicate(column, "unknown")
        } else if msg.starts_with("FOREIGN KEY constraint failed") {
            DbError::ForeignKeyViolation {
                message: msg.to_string(),
            }
        } else {
            DbError::QueryFailed(msg.to_string())
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_sqlite_message(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
