//! # Transaction Coordinator
//!
//! Persists priced sales and their stock effects as one unit of work.
//!
//! ## Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  begin ──► insert header ──► for each line:                             │
//! │                                insert item                              │
//! │                                conditional_decrement(product, qty)      │
//! │                                  1 row ──► next line                    │
//! │                                  0 rows ─► stock_level ─► rollback      │
//! │                                            InsufficientStock / NotFound │
//! │            ──► commit                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Update and Delete
//! ```text
//! begin ──► claim sale ──► increment every old line (restore)
//!       ──► update: replace header, delete items, rerun the commit loop
//!       ──► delete: delete items, delete header
//!       ──► commit
//! ```
//!
//! Any error rolls the whole unit back, restores included. No step is
//! retried. Between the restore and the new decrement another sale may take
//! the restored units; the update then fails with `InsufficientStock`.
//!
//! Store reads that happen outside the unit (pricing, enrichment) must not
//! run while a unit is open: the in-memory backend serializes on one lock and
//! a single-connection SQLite pool has nothing left to lend.

use std::sync::Arc;

use stockroom_core::{timestamp_now, LineItem, PricedItem, PricedSale, Sale, SaleHeader};
use stockroom_db::{generate_sale_id, SaleStore, UnitOfWork};
use tracing::{debug, info, warn};

use crate::error::{SaleError, SaleResult};

/// Runs sale writes inside units of work.
#[derive(Clone)]
pub struct Coordinator {
    sales: Arc<dyn SaleStore>,
}

impl Coordinator {
    pub fn new(sales: Arc<dyn SaleStore>) -> Self {
        Self { sales }
    }

    /// Persists a new sale and decrements stock for every line.
    pub async fn commit_sale(&self, priced: &PricedSale) -> SaleResult<Sale> {
        let header = SaleHeader::from_priced(generate_sale_id(), priced, timestamp_now());

        let mut unit = self.sales.begin().await?;
        let written = async {
            unit.insert_sale(&header).await?;
            write_lines(unit.as_mut(), &header.id, priced).await
        }
        .await;

        let items = finish(unit, written, &header.id).await?;

        info!(
            sale_id = %header.id,
            customer = %header.customer,
            lines = items.len(),
            total_cents = header.total_cents,
            "Sale committed"
        );
        Ok(Sale::from_parts(header, items))
    }

    /// Replaces sale `sale_id` with `priced`.
    ///
    /// The old lines are restored to stock, the header keeps its id and
    /// `sold_at`, and the new lines go through the same loop as a commit.
    pub async fn update_sale(&self, sale_id: &str, priced: &PricedSale) -> SaleResult<Sale> {
        let mut unit = self.sales.begin().await?;
        let written = async {
            let existing = claim(unit.as_mut(), sale_id).await?;
            restore_lines(unit.as_mut(), sale_id).await?;

            let header = existing.replace_with(priced, timestamp_now());
            unit.update_sale(&header).await?;
            unit.delete_items(sale_id).await?;

            let items = write_lines(unit.as_mut(), sale_id, priced).await?;
            Ok::<_, SaleError>((header, items))
        }
        .await;

        let (header, items) = finish(unit, written, sale_id).await?;

        info!(
            sale_id = %sale_id,
            lines = items.len(),
            total_cents = header.total_cents,
            "Sale updated"
        );
        Ok(Sale::from_parts(header, items))
    }

    /// Deletes sale `sale_id` and returns its units to stock.
    pub async fn delete_sale(&self, sale_id: &str) -> SaleResult<()> {
        let mut unit = self.sales.begin().await?;
        let written = async {
            claim(unit.as_mut(), sale_id).await?;
            let restored = restore_lines(unit.as_mut(), sale_id).await?;
            unit.delete_items(sale_id).await?;
            unit.delete_sale(sale_id).await?;
            Ok::<_, SaleError>(restored)
        }
        .await;

        let restored = finish(unit, written, sale_id).await?;

        info!(sale_id = %sale_id, restored_lines = restored, "Sale deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Steps
// =============================================================================

/// Commits on success, rolls back on failure.
async fn finish<T>(
    unit: Box<dyn UnitOfWork>,
    written: SaleResult<T>,
    sale_id: &str,
) -> SaleResult<T> {
    match written {
        Ok(value) => {
            unit.commit().await?;
            Ok(value)
        }
        Err(err) => {
            warn!(sale_id = %sale_id, error = %err, "Aborting sale unit of work");
            if let Err(rollback_err) = unit.rollback().await {
                warn!(sale_id = %sale_id, error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

async fn claim(unit: &mut dyn UnitOfWork, sale_id: &str) -> SaleResult<SaleHeader> {
    unit.claim_sale(sale_id)
        .await?
        .ok_or_else(|| SaleError::not_found("Sale", sale_id))
}

/// Inserts every priced line and takes its units off the shelf.
async fn write_lines(
    unit: &mut dyn UnitOfWork,
    sale_id: &str,
    priced: &PricedSale,
) -> SaleResult<Vec<LineItem>> {
    let mut items = Vec::with_capacity(priced.items.len());

    for (position, line) in priced.items.iter().enumerate() {
        let item = LineItem::from_priced(generate_sale_id(), sale_id, position, line);
        unit.insert_item(&item).await?;

        let rows = unit.conditional_decrement(&line.product_id, line.quantity).await?;
        if rows == 0 {
            return Err(shortfall(unit, line).await);
        }

        debug!(
            sale_id = %sale_id,
            product_id = %line.product_id,
            quantity = line.quantity,
            "Stock decremented"
        );
        items.push(item);
    }

    Ok(items)
}

/// Explains a conditional decrement that changed nothing.
async fn shortfall(unit: &mut dyn UnitOfWork, line: &PricedItem) -> SaleError {
    match unit.stock_level(&line.product_id).await {
        Ok(Some(available)) => {
            warn!(
                product_id = %line.product_id,
                available,
                requested = line.quantity,
                "Stock taken by a concurrent sale"
            );
            SaleError::InsufficientStock {
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                available,
                requested: line.quantity,
            }
        }
        Ok(None) => SaleError::not_found("Product", &line.product_id),
        Err(err) => err.into(),
    }
}

/// Returns the units held by a sale's current lines to stock.
async fn restore_lines(unit: &mut dyn UnitOfWork, sale_id: &str) -> SaleResult<usize> {
    let items = unit.sale_items(sale_id).await?;

    for item in &items {
        let rows = unit.increment(&item.product_id, item.quantity).await?;
        if rows == 0 {
            // Product deleted since the sale; nothing to give back to.
            warn!(
                sale_id = %sale_id,
                product_id = %item.product_id,
                quantity = item.quantity,
                "Skipping restore for missing product"
            );
        }
    }

    Ok(items.len())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_engine, product, sqlite_engine};
    use stockroom_core::{DraftItem, DraftSale, ValidationError};
    use stockroom_db::ProductStore;

    #[tokio::test]
    async fn test_scenario_a_commit_decrements_stock() {
        let (engine, store) = memory_engine(vec![product("p", "P", 1000, 5)]);

        let sale = engine
            .create_sale(&DraftSale::new("alice", vec![DraftItem::new("p", 3)]))
            .await
            .unwrap();

        assert_eq!(sale.header.total_cents, 3000);
        assert_eq!(sale.items.len(), 1);
        assert_eq!(store.get("p").await.unwrap().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_scenario_b_insufficient_stock_leaves_quantity() {
        let (engine, store) = memory_engine(vec![product("p", "P", 1000, 2)]);

        let err = engine
            .create_sale(&DraftSale::new("alice", vec![DraftItem::new("p", 3)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SaleError::InsufficientStock { available: 2, requested: 3, .. }
        ));
        assert_eq!(store.get("p").await.unwrap().unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_scenario_c_discounted_total() {
        let (engine, _) = memory_engine(vec![product("p", "P", 1000, 5)]);

        let draft = DraftSale::new("alice", vec![DraftItem::new("p", 3)]).with_discount(10.0);
        let sale = engine.create_sale(&draft).await.unwrap();

        assert_eq!(sale.header.subtotal_cents, 3000);
        assert_eq!(sale.header.discount_bps, 1000);
        assert_eq!(sale.header.discount_cents, 300);
        assert_eq!(sale.header.total_cents, 2700);
    }

    #[tokio::test]
    async fn test_scenario_e_update_restores_then_decrements() {
        let (engine, store) = memory_engine(vec![product("p", "P", 1000, 5)]);

        let sale = engine
            .create_sale(&DraftSale::new("alice", vec![DraftItem::new("p", 3)]))
            .await
            .unwrap();
        assert_eq!(store.get("p").await.unwrap().unwrap().quantity, 2);

        let updated = engine
            .update_sale(sale.id(), &DraftSale::new("alice", vec![DraftItem::new("p", 1)]))
            .await
            .unwrap();

        assert_eq!(store.get("p").await.unwrap().unwrap().quantity, 4);
        assert_eq!(updated.id(), sale.id());
        assert_eq!(updated.header.sold_at, sale.header.sold_at);
        assert_eq!(updated.header.total_cents, 1000);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].item.quantity, 1);
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_state_identical() {
        let (engine, store) = memory_engine(vec![
            product("p-1", "First", 1000, 5),
            product("p-2", "Second", 500, 1),
        ]);
        engine
            .create_sale(&DraftSale::new("alice", vec![DraftItem::new("p-1", 1)]))
            .await
            .unwrap();
        let before = store.snapshot().await;

        // Priced while stock was there, then the second product runs dry.
        let draft = DraftSale::new(
            "bob",
            vec![DraftItem::new("p-1", 2), DraftItem::new("p-2", 1)],
        );
        let priced = engine.pricing().price_sale(&draft).await.unwrap();
        store.conditional_decrement("p-2", 1).await.unwrap();
        let before_commit = store.snapshot().await;
        assert_ne!(before, before_commit);

        let err = engine.coordinator().commit_sale(&priced).await.unwrap_err();
        assert!(matches!(
            err,
            SaleError::InsufficientStock { ref product_id, available: 0, requested: 1, .. }
                if product_id == "p-2"
        ));
        assert_eq!(store.snapshot().await, before_commit);
    }

    #[tokio::test]
    async fn test_commit_with_vanished_product_is_not_found() {
        let (engine, store) = memory_engine(vec![product("p-1", "First", 1000, 5)]);

        let draft = DraftSale::new("alice", vec![DraftItem::new("p-1", 1)]);
        let priced = engine.pricing().price_sale(&draft).await.unwrap();
        store.delete("p-1").await.unwrap();
        let before = store.snapshot().await;

        let err = engine.coordinator().commit_sale(&priced).await.unwrap_err();
        assert!(matches!(err, SaleError::NotFound { ref entity, .. } if entity == "Product"));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_delete_restores_stock() {
        let (engine, store) = memory_engine(vec![
            product("p-1", "First", 1000, 5),
            product("p-2", "Second", 500, 8),
        ]);
        let sale = engine
            .create_sale(&DraftSale::new(
                "alice",
                vec![
                    DraftItem::new("p-1", 2),
                    DraftItem::new("p-2", 3),
                    DraftItem::new("p-1", 1),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(store.get("p-1").await.unwrap().unwrap().quantity, 2);
        assert_eq!(store.get("p-2").await.unwrap().unwrap().quantity, 5);

        engine.delete_sale(sale.id()).await.unwrap();

        assert_eq!(store.get("p-1").await.unwrap().unwrap().quantity, 5);
        assert_eq!(store.get("p-2").await.unwrap().unwrap().quantity, 8);
        let err = engine.queries().get_sale(sale.id()).await.unwrap_err();
        assert!(matches!(err, SaleError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_skips_restore_for_deleted_product() {
        let (engine, store) = memory_engine(vec![
            product("p-1", "First", 1000, 5),
            product("p-2", "Second", 500, 8),
        ]);
        let sale = engine
            .create_sale(&DraftSale::new(
                "alice",
                vec![DraftItem::new("p-1", 2), DraftItem::new("p-2", 3)],
            ))
            .await
            .unwrap();
        store.delete("p-1").await.unwrap();

        engine.delete_sale(sale.id()).await.unwrap();

        assert!(store.get("p-1").await.unwrap().is_none());
        assert_eq!(store.get("p-2").await.unwrap().unwrap().quantity, 8);
    }

    #[tokio::test]
    async fn test_restore_past_i64_max_rolls_back() {
        let (engine, store) = memory_engine(vec![product("p-1", "First", 1000, 5)]);
        let sale = engine
            .create_sale(&DraftSale::new("alice", vec![DraftItem::new("p-1", 2)]))
            .await
            .unwrap();
        let mut full = store.get("p-1").await.unwrap().unwrap();
        full.quantity = i64::MAX;
        store.update(&full).await.unwrap();
        let before = store.snapshot().await;

        let err = engine.delete_sale(sale.id()).await.unwrap_err();
        assert!(matches!(err, SaleError::Validation(ValidationError::Overflow { .. })));

        let err = engine
            .update_sale(sale.id(), &DraftSale::new("alice", vec![DraftItem::new("p-1", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SaleError::Validation(ValidationError::Overflow { .. })));
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_sale() {
        let (engine, store) = memory_engine(vec![product("p-1", "First", 1000, 5)]);
        let before = store.snapshot().await;

        let priced = engine
            .pricing()
            .price_sale(&DraftSale::new("alice", vec![DraftItem::new("p-1", 1)]))
            .await
            .unwrap();
        let err = engine.coordinator().update_sale("missing", &priced).await.unwrap_err();
        assert!(matches!(err, SaleError::NotFound { ref entity, .. } if entity == "Sale"));

        let err = engine.delete_sale("missing").await.unwrap_err();
        assert!(matches!(err, SaleError::NotFound { ref entity, .. } if entity == "Sale"));

        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_failed_update_rolls_back_restores() {
        let (engine, store) = memory_engine(vec![product("p", "P", 1000, 5)]);
        let sale = engine
            .create_sale(&DraftSale::new("alice", vec![DraftItem::new("p", 3)]))
            .await
            .unwrap();

        // Priced against 2 on hand + 3 held, then another sale takes the 2.
        let replacement = engine
            .pricing()
            .price_replacement(sale.id(), &DraftSale::new("alice", vec![DraftItem::new("p", 5)]))
            .await
            .unwrap();
        engine
            .create_sale(&DraftSale::new("bob", vec![DraftItem::new("p", 2)]))
            .await
            .unwrap();
        let before = store.snapshot().await;

        let err = engine
            .coordinator()
            .update_sale(sale.id(), &replacement)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SaleError::InsufficientStock { available: 3, requested: 5, .. }
        ));
        assert_eq!(store.snapshot().await, before);
        assert_eq!(store.get("p").await.unwrap().unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_sqlite_commit_update_delete() {
        let (engine, db) = sqlite_engine(vec![product("p", "P", 1000, 5)]).await;
        let products = db.products();

        let sale = engine
            .create_sale(&DraftSale::new("alice", vec![DraftItem::new("p", 3)]))
            .await
            .unwrap();
        assert_eq!(products.get("p").await.unwrap().unwrap().quantity, 2);

        let err = engine
            .create_sale(&DraftSale::new("bob", vec![DraftItem::new("p", 3)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SaleError::InsufficientStock { available: 2, .. }));

        engine
            .update_sale(sale.id(), &DraftSale::new("alice", vec![DraftItem::new("p", 1)]))
            .await
            .unwrap();
        assert_eq!(products.get("p").await.unwrap().unwrap().quantity, 4);

        engine.delete_sale(sale.id()).await.unwrap();
        assert_eq!(products.get("p").await.unwrap().unwrap().quantity, 5);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sqlite_restore_past_i64_max_rolls_back() {
        let (engine, db) = sqlite_engine(vec![product("p", "P", 1000, 5)]).await;
        let products = db.products();
        let sale = engine
            .create_sale(&DraftSale::new("alice", vec![DraftItem::new("p", 3)]))
            .await
            .unwrap();
        products.increment("p", i64::MAX - 2).await.unwrap();

        let err = engine.delete_sale(sale.id()).await.unwrap_err();
        assert!(matches!(err, SaleError::Validation(ValidationError::Overflow { .. })));

        assert_eq!(products.get("p").await.unwrap().unwrap().quantity, i64::MAX);
        assert_eq!(engine.queries().get_sale(sale.id()).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_sqlite_commit_race_rolls_back() {
        let (engine, db) = sqlite_engine(vec![
            product("p-1", "First", 1000, 5),
            product("p-2", "Second", 500, 1),
        ])
        .await;
        let products = db.products();

        let priced = engine
            .pricing()
            .price_sale(&DraftSale::new(
                "bob",
                vec![DraftItem::new("p-1", 2), DraftItem::new("p-2", 1)],
            ))
            .await
            .unwrap();
        products.conditional_decrement("p-2", 1).await.unwrap();

        let err = engine.coordinator().commit_sale(&priced).await.unwrap_err();
        assert!(matches!(err, SaleError::InsufficientStock { available: 0, .. }));

        assert_eq!(products.get("p-1").await.unwrap().unwrap().quantity, 5);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }
}
