//! # Schema Migrations
//!
//! The SQL under `migrations/sqlite/` is compiled into the binary and applied
//! by [`Database::new`](crate::Database::new) before any store is handed out.
//!
//! ```text
//!   migrations/sqlite/001_initial_schema.sql
//!        products      id, name, description, price_cents, quantity (>= 0)
//!        sales         id, customer, discount_bps, totals, sold_at
//!        sale_items    sale_id → sales(id) ON DELETE CASCADE
//!   migrations/sqlite/002_customers.sql
//!        customers     id, name, email, phone, address, tax_id (unique)
//!
//!   applied versions are tracked in _sqlx_migrations
//! ```
//!
//! Files are applied in name order. Shipped files are never edited; a
//! schema change is a new `NNN_*.sql` file.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static SCHEMA: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded. Safe to call repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let pending = SCHEMA.migrations.len();
    info!(known = pending, "Applying schema migrations");

    SCHEMA.run(pool).await?;
    Ok(())
}

/// `(known, applied)` migration counts. A database that has never been
/// migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or_default();

    Ok((SCHEMA.migrations.len(), applied.max(0) as usize))
}
