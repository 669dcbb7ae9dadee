//! # Domain Types
//!
//! Core domain types used throughout Stockroom.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Caller input            Priced (in memory)        Persisted            │
//! │  ┌───────────────┐       ┌───────────────┐        ┌───────────────┐     │
//! │  │  DraftSale    │──────►│  PricedSale   │───────►│  SaleHeader   │     │
//! │  │  customer     │ price │  subtotal     │ commit │  id (UUID)    │     │
//! │  │  items[]      │       │  discount     │        │  sold_at      │     │
//! │  │  discount %   │       │  total        │        │  totals       │     │
//! │  └───────┬───────┘       └───────┬───────┘        └───────┬───────┘     │
//! │          │                       │                        │             │
//! │  ┌───────▼───────┐       ┌───────▼───────┐        ┌───────▼───────┐     │
//! │  │  DraftItem    │       │  PricedItem   │        │  LineItem     │     │
//! │  │  product_id   │       │  unit price   │        │  position     │     │
//! │  │  quantity     │       │  subtotal     │        │  captured $   │     │
//! │  └───────────────┘       └───────────────┘        └───────────────┘     │
//! │                                                                         │
//! │  Read side:  Sale = SaleHeader + [SaleLine = LineItem + snapshot?]      │
//! │  Catalog:    Product, ProductInput, ProductSnapshot                     │
//! │  Customers:  Customer, CustomerInput                                    │
//! │  Reports:    SalesSummary, ProductSales, MonthlySales                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A line item freezes the unit price at sale time. The product it points to
//! may later change price or be deleted; reads attach a best-effort
//! [`ProductSnapshot`] of the product as it is *now*, falling back to a
//! placeholder when the product is gone.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::PRODUCT_NOT_FOUND_NAME;

/// Current time truncated to microseconds.
///
/// Timestamps are stored as fixed-width RFC 3339 text with microsecond
/// precision; truncating up front keeps in-memory and persisted values equal.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% off, 10000 bps = 100% off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Largest valid rate (100%).
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a discount rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        DiscountRate(bps)
    }

    /// Creates a discount rate from a percentage, rounded to the nearest
    /// basis point.
    ///
    /// Callers validate the range first (see
    /// [`validate_discount_percent`](crate::validation::validate_discount_percent)).
    pub fn from_percentage(pct: f64) -> Self {
        DiscountRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// No discount.
    #[inline]
    pub const fn zero() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for DiscountRate {
    fn default() -> Self {
        DiscountRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4 when generated).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Unit price in cents. Always positive.
    pub price_cents: i64,

    /// Quantity on hand. Never negative when written through the engine.
    pub quantity: i64,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last edited through the catalog.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.quantity >= quantity
    }
}

/// Caller-supplied fields for creating or editing a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub quantity: i64,
}

/// Current view of a product attached to a line item on read.
///
/// `found == false` marks the placeholder used when the product has been
/// deleted since the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub found: bool,
}

impl ProductSnapshot {
    pub fn not_found(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            name: PRODUCT_NOT_FOUND_NAME.to_string(),
            price_cents: 0,
            quantity: 0,
            found: false,
        }
    }
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price_cents: product.price_cents,
            quantity: product.quantity,
            found: true,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
///
/// Sales keep their own free-text `customer` reference; registering a
/// customer does not link past or future sales to this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// National tax id (CPF). Unique across customers.
    pub tax_id: String,
    /// Set once on registration; edits never move it.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for registering or editing a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub tax_id: String,
}

// =============================================================================
// Draft Sale (caller input)
// =============================================================================

/// One requested line of a draft sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    pub product_id: String,
    pub quantity: i64,
}

impl DraftItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A sale as submitted by the caller, before validation and pricing.
///
/// Prices are never supplied here; they are resolved from the catalog.
///
/// ## JSON shape
/// ```json
/// { "customer": "c-1", "items": [{ "productId": "p-1", "quantity": 3 }], "discountPercent": 10 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DraftSale {
    pub customer: String,
    pub items: Vec<DraftItem>,
    /// Flat percentage off the subtotal, 0 to 100. Absent means 0.
    #[serde(default)]
    pub discount_percent: Option<f64>,
}

impl DraftSale {
    pub fn new(customer: impl Into<String>, items: Vec<DraftItem>) -> Self {
        Self {
            customer: customer.into(),
            items,
            discount_percent: None,
        }
    }

    pub fn with_discount(mut self, percent: f64) -> Self {
        self.discount_percent = Some(percent);
        self
    }
}

// =============================================================================
// Priced Sale (validated, not yet persisted)
// =============================================================================

/// A draft line with its unit price resolved from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedItem {
    pub product_id: String,
    /// Product name at pricing time, used in stock error messages.
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// quantity × unit price.
    pub subtotal_cents: i64,
}

impl PricedItem {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// Output of pricing: every amount the sale will persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PricedSale {
    pub customer: String,
    pub items: Vec<PricedItem>,
    /// Σ item subtotals.
    pub subtotal_cents: i64,
    pub discount_bps: u32,
    pub discount_cents: i64,
    /// subtotal − discount.
    pub total_cents: i64,
}

impl PricedSale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount_rate(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Persisted Sale
// =============================================================================

/// The `sales` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleHeader {
    pub id: String,
    /// Opaque customer reference.
    pub customer: String,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
    pub subtotal_cents: i64,
    pub discount_bps: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SaleHeader {
    /// Builds a fresh header for a priced sale.
    pub fn from_priced(id: impl Into<String>, priced: &PricedSale, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            customer: priced.customer.clone(),
            sold_at: now,
            subtotal_cents: priced.subtotal_cents,
            discount_bps: i64::from(priced.discount_bps),
            discount_cents: priced.discount_cents,
            total_cents: priced.total_cents,
            updated_at: now,
        }
    }

    /// Replaces every priced field, keeping `id` and `sold_at`.
    pub fn replace_with(&self, priced: &PricedSale, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id.clone(),
            customer: priced.customer.clone(),
            sold_at: self.sold_at,
            subtotal_cents: priced.subtotal_cents,
            discount_bps: i64::from(priced.discount_bps),
            discount_cents: priced.discount_cents,
            total_cents: priced.total_cents,
            updated_at: now,
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// The `sale_items` row.
/// Uses snapshot pattern to freeze the unit price at time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Zero-based order in which the line was submitted.
    pub position: i64,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl LineItem {
    pub fn from_priced(
        id: impl Into<String>,
        sale_id: impl Into<String>,
        position: usize,
        priced: &PricedItem,
    ) -> Self {
        Self {
            id: id.into(),
            sale_id: sale_id.into(),
            product_id: priced.product_id.clone(),
            position: position as i64,
            quantity: priced.quantity,
            unit_price_cents: priced.unit_price_cents,
            subtotal_cents: priced.subtotal_cents,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// A persisted line plus, on single-sale reads, the current product view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    #[serde(flatten)]
    pub item: LineItem,
    pub product: Option<ProductSnapshot>,
}

/// A sale aggregate: header plus ordered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(flatten)]
    pub header: SaleHeader,
    pub items: Vec<SaleLine>,
}

impl Sale {
    /// Assembles an aggregate without product enrichment.
    pub fn from_parts(header: SaleHeader, items: Vec<LineItem>) -> Self {
        Self {
            header,
            items: items
                .into_iter()
                .map(|item| SaleLine {
                    item,
                    product: None,
                })
                .collect(),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.header.id
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.header.total()
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Totals over the sales in a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
    pub sale_count: i64,
    /// Σ subtotals before discount.
    pub gross_cents: i64,
    pub discount_cents: i64,
    /// Σ totals.
    pub revenue_cents: i64,
}

/// Units and revenue for one product over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: String,
    pub units_sold: i64,
    pub revenue_cents: i64,
}

/// Sale count and revenue for one calendar month (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySales {
    /// `YYYY-MM`.
    pub month: String,
    pub sale_count: i64,
    pub revenue_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_input_optional_contact_fields() {
        let json = r#"{"name":"Ana","email":"ana@example.com","taxId":"123.456.789-00"}"#;
        let input: CustomerInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.tax_id, "123.456.789-00");
        assert_eq!(input.phone, None);
        assert_eq!(input.address, None);
    }

    #[test]
    fn test_discount_rate_from_percentage() {
        assert_eq!(DiscountRate::from_percentage(10.0).bps(), 1000);
        assert_eq!(DiscountRate::from_percentage(12.345).bps(), 1235);
        assert_eq!(DiscountRate::from_percentage(100.0).bps(), DiscountRate::MAX_BPS);
        assert!((DiscountRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_discount_rate_default_is_zero() {
        assert!(DiscountRate::default().is_zero());
    }

    #[test]
    fn test_draft_sale_deserializes_camel_case() {
        let json = r#"{"customer":"c-1","items":[{"productId":"p-1","quantity":3}],"discountPercent":10}"#;
        let draft: DraftSale = serde_json::from_str(json).unwrap();
        assert_eq!(draft.customer, "c-1");
        assert_eq!(draft.items, vec![DraftItem::new("p-1", 3)]);
        assert_eq!(draft.discount_percent, Some(10.0));
    }

    #[test]
    fn test_draft_sale_discount_is_optional() {
        let json = r#"{"customer":"c-1","items":[]}"#;
        let draft: DraftSale = serde_json::from_str(json).unwrap();
        assert_eq!(draft.discount_percent, None);
    }

    #[test]
    fn test_not_found_snapshot() {
        let snapshot = ProductSnapshot::not_found("gone");
        assert_eq!(snapshot.product_id, "gone");
        assert_eq!(snapshot.name, PRODUCT_NOT_FOUND_NAME);
        assert_eq!(snapshot.price_cents, 0);
        assert_eq!(snapshot.quantity, 0);
        assert!(!snapshot.found);
    }

    #[test]
    fn test_header_replace_keeps_sold_at() {
        let sold_at = timestamp_now();
        let priced = PricedSale {
            customer: "c-1".to_string(),
            items: vec![],
            subtotal_cents: 3000,
            discount_bps: 1000,
            discount_cents: 300,
            total_cents: 2700,
        };
        let header = SaleHeader::from_priced("s-1", &priced, sold_at);

        let later = sold_at + chrono::Duration::seconds(5);
        let replacement = PricedSale {
            customer: "c-2".to_string(),
            discount_bps: 0,
            discount_cents: 0,
            total_cents: 3000,
            ..priced
        };
        let replaced = header.replace_with(&replacement, later);

        assert_eq!(replaced.id, "s-1");
        assert_eq!(replaced.sold_at, sold_at);
        assert_eq!(replaced.updated_at, later);
        assert_eq!(replaced.customer, "c-2");
        assert_eq!(replaced.total_cents, 3000);
    }

    #[test]
    fn test_sale_serializes_flat_header() {
        let now = timestamp_now();
        let header = SaleHeader {
            id: "s-1".to_string(),
            customer: "c-1".to_string(),
            sold_at: now,
            subtotal_cents: 1000,
            discount_bps: 0,
            discount_cents: 0,
            total_cents: 1000,
            updated_at: now,
        };
        let sale = Sale::from_parts(header, vec![]);
        let value = serde_json::to_value(&sale).unwrap();
        assert_eq!(value["id"], "s-1");
        assert_eq!(value["totalCents"], 1000);
        assert!(value["items"].as_array().unwrap().is_empty());
    }
}
