//! # stockroom-db: Persistence Layer for Stockroom
//!
//! This crate defines the store interface the sales engine is written
//! against and ships two interchangeable backings for it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  stockroom-engine (SalesEngine)                                         │
//! │       │   Arc<dyn ProductStore>, Arc<dyn SaleStore>, CustomerStore      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockroom-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌────────────────┐   │   │
//! │  │   │    store      │   │  repository   │   │  store::memory │   │   │
//! │  │   │  (traits)     │◄──│  (SQLite)     │   │  (in-memory)   │   │   │
//! │  │   │ ProductStore  │   │ ProductRepo   │   │  MemoryStore   │   │   │
//! │  │   │ SaleStore     │◄──│ SaleRepo      │   │                │   │   │
//! │  │   │ CustomerStore │◄──│ CustomerRepo  │   │                │   │   │
//! │  │   │ UnitOfWork    │   │ SqliteUoW     │   │  MemoryUoW     │   │   │
//! │  │   └───────────────┘   └───────┬───────┘   └────────────────┘   │   │
//! │  │                               │                                 │   │
//! │  │   ┌───────────────┐   ┌───────▼───────┐                         │   │
//! │  │   │  migrations   │──►│ pool (SQLite) │                         │   │
//! │  │   └───────────────┘   └───────────────┘                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`]: the traits, with a [`UnitOfWork`] for each multi-write sale
//! - [`repository`]: SQLite rows behind those traits
//! - [`store::memory`]: one mutex-guarded map set with identical semantics
//! - [`pool`] / [`migrations`]: opening and migrating the SQLite file
//! - [`error`]: [`DbError`], shared by both backends
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig, ProductStore};
//!
//! let db = Database::new(DbConfig::from_env()).await?;
//! let products = db.products().list().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::memory::{MemoryState, MemoryStore};
pub use store::{
    CustomerStore, MonthlyTotals, ProductStore, ProductUnits, SaleFilter, SaleStore, SalesTotals,
    UnitOfWork,
};

pub use repository::customer::{generate_customer_id, CustomerRepository};

pub use repository::product::{generate_product_id, ProductRepository};
pub use repository::sale::{generate_sale_id, SaleRepository, SqliteUnitOfWork};
