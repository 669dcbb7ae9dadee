//! # stockroom-core: Pure Business Logic for Stockroom
//!
//! This crate holds everything about a sale that can be decided without
//! touching a datastore: domain types, money math, validation and pricing.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Callers (HTTP handlers, CLI tools, frontends)          │   │
//! │  │        DraftSale in ──►                ◄── Sale / SaleError      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  stockroom-engine (Level 2)                     │   │
//! │  │   pricing • coordinator • query • catalog • reports             │   │
//! │  └───────────────┬─────────────────────────────────┬───────────────┘   │
//! │                  │                                 │                    │
//! │  ┌───────────────▼─────────────────┐ ┌─────────────▼───────────────┐   │
//! │  │  ★ stockroom-core (THIS CRATE) ★│ │  stockroom-db (Level 1)     │   │
//! │  │                                 │ │  store traits, SQLite,      │   │
//! │  │  types • money • validation     │ │  in-memory backend          │   │
//! │  │  pricing • error                │ └─────────────────────────────┘   │
//! │  │                                 │                                    │
//! │  │  NO I/O • NO DATABASE • PURE    │                                    │
//! │  └─────────────────────────────────┘                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`]: catalog products, customers, drafts, priced and persisted sales, report rows
//! - [`money`]: cent amounts and basis-point discounts
//! - [`validation`]: field and range checks run before any store call
//! - [`pricing`]: turns a draft plus a product snapshot into a [`PricedSale`]
//! - [`error`]: [`ValidationError`] and [`CoreError`]
//!
//! Nothing here reads a clock except [`timestamp_now`], and nothing does I/O.
//! Amounts are `i64` cents throughout; percentages only exist at the edge,
//! as the `discount_percent` a caller sends.
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::money::Money;
//! use stockroom_core::types::DiscountRate;
//!
//! // 3 units at $10.00 with 10% off
//! let subtotal = Money::from_cents(1000) * 3;
//! let rate = DiscountRate::from_percentage(10.0);
//!
//! assert_eq!(subtotal.discount_of(rate).cents(), 300);
//! assert_eq!(subtotal.apply_discount(rate).cents(), 2700);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a product name, in characters.
pub const MAX_PRODUCT_NAME_LEN: usize = 200;

/// Maximum length of a customer's name, email, phone or address.
pub const MAX_CUSTOMER_FIELD_LEN: usize = 200;

/// Maximum length of a customer tax id, punctuation included.
pub const MAX_TAX_ID_LEN: usize = 32;

/// Name shown for a line item whose product has since been deleted.
pub const PRODUCT_NOT_FOUND_NAME: &str = "product not found";
