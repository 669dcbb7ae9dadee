//! Test fixtures shared by the engine's unit tests.

use std::sync::Arc;

use stockroom_core::{timestamp_now, Product};
use stockroom_db::{Database, DbConfig, MemoryStore, ProductStore};

use crate::{EngineConfig, SalesEngine};

pub(crate) fn product(id: &str, name: &str, price_cents: i64, quantity: i64) -> Product {
    let now = timestamp_now();
    Product {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        price_cents,
        quantity,
        created_at: now,
        updated_at: now,
    }
}

/// Engine over a fresh in-memory store. The store handle shares its state.
pub(crate) fn memory_engine(products: Vec<Product>) -> (SalesEngine, MemoryStore) {
    let store = MemoryStore::with_products(products);
    let engine = SalesEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        EngineConfig::default(),
    );
    (engine, store)
}

/// Engine over a fresh in-memory SQLite database.
pub(crate) async fn sqlite_engine(products: Vec<Product>) -> (SalesEngine, Database) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    for product in &products {
        db.products().insert(product).await.unwrap();
    }
    let engine = SalesEngine::from_database(&db, EngineConfig::default());
    (engine, db)
}
