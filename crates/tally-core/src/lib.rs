//! # tally-core: Pure Business Logic for Tally
//!
//! Everything here is deterministic and free of I/O. The database layer
//! (`tally-db`) calls into this crate to price transactions, decide stock
//! changes and validate requests before it writes anything.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  pricing  │  │   stock   │  │ validation│  │   │
//! │  │   │  Product  │  │ subtotal  │  │ in / out  │  │  request  │  │   │
//! │  │   │Transaction│  │ discount  │  │ adjustment│  │  checks   │  │   │
//! │  │   │  Client   │  │   VAT     │  │   floor   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │           tally-db (SQLite repositories + ledger)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, Transaction, StockMovement, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Subtotal, discount, VAT and total for a set of line items
//! - [`stock`] - How a stock direction changes a product's quantity
//! - [`request`] - Inputs accepted by the ledger operations
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::pricing::{price, PricingInput};
//! use tally_core::request::{DiscountSpec, LineItem, VatSpec};
//! use tally_core::{Money, Rate};
//!
//! let items = vec![
//!     LineItem::new("p-1", 2, Money::from_cents(1000)),
//!     LineItem::new("p-2", 1, Money::from_cents(500)),
//! ];
//! let input = PricingInput {
//!     discount: Some(DiscountSpec::Percentage(Rate::from_bps(1000))),
//!     vat: Some(VatSpec::enabled(Rate::from_bps(1300))),
//!     ..PricingInput::new(&items)
//! };
//!
//! let breakdown = price(&input);
//! assert_eq!(breakdown.subtotal.cents(), 2500);
//! assert_eq!(breakdown.vat_amount.cents(), 293);
//! assert_eq!(breakdown.total_amount.cents(), 2543);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod request;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Rate};
pub use pricing::PricingBreakdown;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum line items accepted in a single transaction.
pub const MAX_LINE_ITEMS: usize = 500;

/// Maximum quantity of a single line item or stock adjustment.
pub const MAX_ITEM_QUANTITY: i64 = 1_000_000;

/// Largest single money amount accepted from a caller: a unit price, a
/// fixed discount, a supplied override, a payment or a credit limit.
pub const MAX_MONEY_CENTS: i64 = 1_000_000_000;

// A full transaction at the limits, with 100% VAT on top, still fits in i64.
const _: () = assert!(
    (MAX_LINE_ITEMS as i128) * (MAX_ITEM_QUANTITY as i128) * (MAX_MONEY_CENTS as i128) * 2
        < i64::MAX as i128
);

/// Maximum length of free-text fields (notes, reasons).
pub const MAX_NOTE_LENGTH: usize = 1000;
