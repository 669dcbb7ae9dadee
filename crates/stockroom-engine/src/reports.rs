//! # Reports
//!
//! Period totals, best sellers, monthly breakdowns and low stock. Amounts
//! are in cents. Days and months are UTC.
//!
//! ```text
//!   today_summary()        ──► sales_summary(00:00:00, 23:59:59.999999)
//!   last_twelve_months()   ──► sales_by_month(1st of month - 11 months, now)
//! ```
//!
//! Best sellers are named from the current catalog; a product deleted since
//! it was sold is listed under the "product not found" placeholder.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use stockroom_core::validation::{validate_limit, validate_period, validate_stock_level};
use stockroom_core::{
    timestamp_now, MonthlySales, Product, ProductSales, SalesSummary, PRODUCT_NOT_FOUND_NAME,
};
use stockroom_db::{ProductStore, SaleStore};
use tracing::debug;

use crate::config::ReportSettings;
use crate::error::SaleResult;

/// Report queries.
#[derive(Clone)]
pub struct Reports {
    products: Arc<dyn ProductStore>,
    sales: Arc<dyn SaleStore>,
    settings: ReportSettings,
}

impl Reports {
    pub fn new(products: Arc<dyn ProductStore>, sales: Arc<dyn SaleStore>, settings: ReportSettings) -> Self {
        Self {
            products,
            sales,
            settings,
        }
    }

    /// Count, gross, discount and revenue over sales in `[start, end]`.
    pub async fn sales_summary(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> SaleResult<SalesSummary> {
        validate_period(start, end)?;
        let totals = self.sales.summary(start, end).await?;

        debug!(sales = totals.sale_count, revenue_cents = totals.revenue_cents, "sales_summary");
        Ok(SalesSummary {
            start,
            end,
            sale_count: totals.sale_count,
            gross_cents: totals.gross_cents,
            discount_cents: totals.discount_cents,
            revenue_cents: totals.revenue_cents,
        })
    }

    /// Totals over today's sales.
    pub async fn today_summary(&self) -> SaleResult<SalesSummary> {
        let (start, end) = utc_day(timestamp_now());
        self.sales_summary(start, end).await
    }

    /// Sale count and revenue per month over `[start, end]`, newest month
    /// first. Months without sales are left out.
    pub async fn sales_by_month(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> SaleResult<Vec<MonthlySales>> {
        validate_period(start, end)?;
        let months = self.sales.monthly_totals(start, end).await?;

        debug!(months = months.len(), "sales_by_month");
        Ok(months
            .into_iter()
            .map(|m| MonthlySales {
                month: m.month,
                sale_count: m.sale_count,
                revenue_cents: m.revenue_cents,
            })
            .collect())
    }

    /// [`sales_by_month`](Self::sales_by_month) for the current month and
    /// the eleven before it.
    pub async fn last_twelve_months(&self) -> SaleResult<Vec<MonthlySales>> {
        let now = timestamp_now();
        self.sales_by_month(twelve_months_before(now), now).await
    }

    /// Best sellers in `[start, end]` by units. `limit` defaults to the
    /// configured top-products limit.
    pub async fn top_products(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: Option<u32>,
    ) -> SaleResult<Vec<ProductSales>> {
        validate_period(start, end)?;
        let limit = limit.unwrap_or(self.settings.top_products_limit);
        validate_limit(limit)?;

        let rows = self.sales.top_products(start, end, limit).await?;
        let ids: Vec<String> = rows.iter().map(|r| r.product_id.clone()).collect();
        let names: HashMap<String, String> = self
            .products
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        Ok(rows
            .into_iter()
            .map(|row| ProductSales {
                product_name: names
                    .get(&row.product_id)
                    .cloned()
                    .unwrap_or_else(|| PRODUCT_NOT_FOUND_NAME.to_string()),
                product_id: row.product_id,
                units_sold: row.units_sold,
                revenue_cents: row.revenue_cents,
            })
            .collect())
    }

    /// Products at or below `threshold` units, lowest first. Both arguments
    /// fall back to the configured defaults.
    pub async fn low_stock(&self, threshold: Option<i64>, limit: Option<u32>) -> SaleResult<Vec<Product>> {
        let threshold = threshold.unwrap_or(self.settings.low_stock_threshold);
        let limit = limit.unwrap_or(self.settings.top_products_limit);
        validate_stock_level(threshold)?;
        validate_limit(limit)?;

        Ok(self.products.low_stock(threshold, limit).await?)
    }
}

/// First and last microsecond of the UTC day holding `now`.
fn utc_day(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);
    (start, start + Duration::days(1) - Duration::microseconds(1))
}

/// Midnight on the 1st of the month eleven months before `now`'s month.
fn twelve_months_before(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .and_then(|first| first.checked_sub_months(Months::new(11)))
        .and_then(|first| first.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_engine, product, sqlite_engine};
    use crate::{SaleError, SalesEngine};
    use chrono::TimeZone;
    use stockroom_db::DbError;
    use stockroom_core::{DraftItem, DraftSale};

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = timestamp_now();
        (now - Duration::hours(1), now + Duration::hours(1))
    }

    async fn sell(engine: &SalesEngine) {
        engine
            .create_sale(
                &DraftSale::new(
                    "alice",
                    vec![DraftItem::new("p-1", 3), DraftItem::new("p-2", 1)],
                )
                .with_discount(10.0),
            )
            .await
            .unwrap();
        engine
            .create_sale(&DraftSale::new(
                "bob",
                vec![DraftItem::new("p-2", 1), DraftItem::new("p-3", 1)],
            ))
            .await
            .unwrap();
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("p-1", "Widget", 1000, 20),
            product("p-2", "Gadget", 500, 20),
            product("p-3", "Gizmo", 200, 3),
        ]
    }

    #[tokio::test]
    async fn test_sales_summary() {
        let (engine, _) = memory_engine(catalog());
        sell(&engine).await;

        let (start, end) = window();
        let summary = engine.reports().sales_summary(start, end).await.unwrap();
        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.gross_cents, 3500 + 700);
        assert_eq!(summary.discount_cents, 350);
        assert_eq!(summary.revenue_cents, 3150 + 700);

        let empty = engine
            .reports()
            .sales_summary(start - Duration::days(2), start - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(empty.sale_count, 0);
        assert_eq!(empty.revenue_cents, 0);

        assert!(engine.reports().sales_summary(end, start).await.is_err());
    }

    #[tokio::test]
    async fn test_top_products_names_deleted_products() {
        let (engine, _) = memory_engine(catalog());
        sell(&engine).await;
        engine.catalog().delete_product("p-1").await.unwrap();

        let (start, end) = window();
        let top = engine.reports().top_products(start, end, None).await.unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].product_id, "p-1");
        assert_eq!(top[0].product_name, PRODUCT_NOT_FOUND_NAME);
        assert_eq!(top[0].units_sold, 3);
        assert_eq!(top[0].revenue_cents, 3000);
        assert_eq!(top[1].product_name, "Gadget");
        assert_eq!(top[1].units_sold, 2);

        let top = engine.reports().top_products(start, end, Some(1)).await.unwrap();
        assert_eq!(top.len(), 1);

        assert!(engine.reports().top_products(start, end, Some(0)).await.is_err());
    }

    #[tokio::test]
    async fn test_low_stock_defaults() {
        let (engine, _) = memory_engine(catalog());
        sell(&engine).await;

        // Default threshold 10: only Gizmo (2 left).
        let low = engine.reports().low_stock(None, None).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, "p-3");
        assert_eq!(low[0].quantity, 2);

        let low = engine.reports().low_stock(Some(100), None).await.unwrap();
        let ids: Vec<&str> = low.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p-3", "p-1", "p-2"]);

        assert!(engine.reports().low_stock(Some(-1), None).await.is_err());
    }

    async fn assert_overflowing_sums_fail(engine: &SalesEngine) {
        for customer in ["alice", "bob"] {
            engine
                .create_sale(&DraftSale::new(customer, vec![DraftItem::new("max", 1)]))
                .await
                .unwrap();
        }

        let (start, end) = window();
        let err = engine.reports().sales_summary(start, end).await.unwrap_err();
        assert!(matches!(err, SaleError::Transaction(DbError::QueryFailed(ref msg)) if msg == "integer overflow"));

        let err = engine.reports().top_products(start, end, None).await.unwrap_err();
        assert!(matches!(err, SaleError::Transaction(DbError::QueryFailed(ref msg)) if msg == "integer overflow"));
    }

    #[tokio::test]
    async fn test_revenue_past_i64_max_fails_on_both_backends() {
        let priciest = || vec![product("max", "Priciest", i64::MAX, 10)];

        let (memory, _) = memory_engine(priciest());
        assert_overflowing_sums_fail(&memory).await;

        let (sqlite, _db) = sqlite_engine(priciest()).await;
        assert_overflowing_sums_fail(&sqlite).await;
    }

    #[test]
    fn test_utc_day_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        let (start, end) = utc_day(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap() - Duration::microseconds(1)
        );
    }

    #[test]
    fn test_twelve_months_before_crosses_year() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 18, 0, 0).unwrap();
        assert_eq!(
            twelve_months_before(now),
            Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap()
        );

        let december = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(
            twelve_months_before(december),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_today_summary_counts_todays_sales() {
        let (engine, _) = memory_engine(catalog());
        sell(&engine).await;

        let today = engine.reports().today_summary().await.unwrap();
        assert_eq!(today.sale_count, 2);
        assert_eq!(today.revenue_cents, 3150 + 700);
        assert!(today.start <= timestamp_now() && timestamp_now() <= today.end);
    }

    async fn assert_monthly_breakdown(engine: &SalesEngine) {
        sell(engine).await;

        let months = engine.reports().last_twelve_months().await.unwrap();
        assert_eq!(
            months,
            vec![MonthlySales {
                month: timestamp_now().format("%Y-%m").to_string(),
                sale_count: 2,
                revenue_cents: 3150 + 700,
            }]
        );

        let (start, end) = window();
        let err = engine.reports().sales_by_month(end, start).await.unwrap_err();
        assert!(matches!(err, SaleError::Validation(_)));
        assert!(engine
            .reports()
            .sales_by_month(start - Duration::days(60), start - Duration::days(30))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_monthly_breakdown_on_both_backends() {
        let (memory, _) = memory_engine(catalog());
        assert_monthly_breakdown(&memory).await;

        let (sqlite, _db) = sqlite_engine(catalog()).await;
        assert_monthly_breakdown(&sqlite).await;
    }

    #[tokio::test]
    async fn test_sqlite_reports_match_memory() {
        let (memory, _) = memory_engine(catalog());
        let (sqlite, _db) = sqlite_engine(catalog()).await;
        sell(&memory).await;
        sell(&sqlite).await;

        let (start, end) = window();
        let a = memory.reports().sales_summary(start, end).await.unwrap();
        let b = sqlite.reports().sales_summary(start, end).await.unwrap();
        assert_eq!(a, b);

        let a = memory.reports().top_products(start, end, None).await.unwrap();
        let b = sqlite.reports().top_products(start, end, None).await.unwrap();
        assert_eq!(a, b);
    }
}
