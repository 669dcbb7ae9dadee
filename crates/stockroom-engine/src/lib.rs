//! # stockroom-engine: Sales Transaction Engine
//!
//! Turns draft sales into persisted sales with matching stock changes, and
//! serves the read side.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           SalesEngine                                   │
//! │                                                                         │
//! │   DraftSale                                                             │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  ┌──────────────┐  PricedSale  ┌──────────────┐                         │
//! │  │ PricingEngine│─────────────►│ Coordinator  │──► Sale                 │
//! │  │ (reads only) │              │ (one unit of │                         │
//! │  └──────┬───────┘              │  work each)  │                         │
//! │         │                      └──────┬───────┘                         │
//! │         │                             │                                 │
//! │  ┌──────┴──────┐ ┌─────────┐ ┌────────┴────┐ ┌───────────┐              │
//! │  │ SaleQueries │ │ Catalog │ │   Reports   │ │ Customers │              │
//! │  └──────┬──────┘ └────┬────┘ └──────┬──────┘ └─────┬─────┘              │
//! │         ▼             ▼             ▼              ▼                    │
//! │   Arc<dyn ProductStore>  Arc<dyn SaleStore>  Arc<dyn CustomerStore>     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockroom_db::{Database, DbConfig};
//! use stockroom_engine::{EngineConfig, SalesEngine};
//!
//! let db = Database::new(DbConfig::from_env()).await?;
//! let engine = SalesEngine::from_database(&db, EngineConfig::from_env());
//!
//! let draft = DraftSale::new("alice", vec![DraftItem::new(product_id, 3)]).with_discount(10.0);
//! let sale = engine.create_sale(&draft).await?;
//! ```
//!
//! Stores are passed in; nothing here holds a global handle. Any
//! [`ProductStore`], [`SaleStore`] and [`CustomerStore`] work, so tests run
//! the same engine against [`stockroom_db::MemoryStore`] and SQLite.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod customers;
pub mod error;
pub mod pricing;
pub mod query;
pub mod reports;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::Catalog;
pub use config::{ConfigError, EngineConfig, ReportSettings};
pub use coordinator::Coordinator;
pub use customers::Customers;
pub use error::{ErrorKind, ErrorResponse, SaleError, SaleResult};
pub use pricing::PricingEngine;
pub use query::SaleQueries;
pub use reports::Reports;

use std::sync::Arc;

use stockroom_core::{DraftSale, Sale};
use stockroom_db::{CustomerStore, Database, ProductStore, SaleStore};

// =============================================================================
// Engine
// =============================================================================

/// Entry point bundling every engine component over one set of stores.
#[derive(Clone)]
pub struct SalesEngine {
    pricing: PricingEngine,
    coordinator: Coordinator,
    queries: SaleQueries,
    catalog: Catalog,
    customers: Customers,
    reports: Reports,
}

impl SalesEngine {
    pub fn new(
        products: Arc<dyn ProductStore>,
        sales: Arc<dyn SaleStore>,
        customers: Arc<dyn CustomerStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            pricing: PricingEngine::new(Arc::clone(&products), Arc::clone(&sales)),
            coordinator: Coordinator::new(Arc::clone(&sales)),
            queries: SaleQueries::new(Arc::clone(&products), Arc::clone(&sales)),
            catalog: Catalog::new(Arc::clone(&products)),
            customers: Customers::new(customers),
            reports: Reports::new(products, sales, config.reports),
        }
    }

    /// Engine over the SQLite repositories of `db`.
    pub fn from_database(db: &Database, config: EngineConfig) -> Self {
        Self::new(
            Arc::new(db.products()),
            Arc::new(db.sales()),
            Arc::new(db.customers()),
            config,
        )
    }

    /// Prices `draft` against current stock and commits it.
    pub async fn create_sale(&self, draft: &DraftSale) -> SaleResult<Sale> {
        let priced = self.pricing.price_sale(draft).await?;
        self.coordinator.commit_sale(&priced).await
    }

    /// Reprices `draft` crediting the sale's own units and replaces the sale.
    pub async fn update_sale(&self, sale_id: &str, draft: &DraftSale) -> SaleResult<Sale> {
        let priced = self.pricing.price_replacement(sale_id, draft).await?;
        self.coordinator.update_sale(sale_id, &priced).await
    }

    pub async fn delete_sale(&self, sale_id: &str) -> SaleResult<()> {
        stockroom_core::validation::validate_id("sale_id", sale_id)?;
        self.coordinator.delete_sale(sale_id).await
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn queries(&self) -> &SaleQueries {
        &self.queries
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn customers(&self) -> &Customers {
        &self.customers
    }

    pub fn reports(&self) -> &Reports {
        &self.reports
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
