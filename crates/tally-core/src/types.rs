//! # Domain Types
//!
//! Records persisted by the ledger and the enums that classify them.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐      ┌──────────────────┐      ┌──────────────────┐  │
//! │  │   Category   │◄─────│     Product      │◄─────│  StockMovement   │  │
//! │  └──────────────┘      │  stock_quantity  │      │  (append-only)   │  │
//! │                        └────────▲─────────┘      └────────┬─────────┘  │
//! │                                 │                         │ reference  │
//! │  ┌──────────────┐      ┌────────┴─────────┐      ┌────────▼─────────┐  │
//! │  │    Client    │◄─────│   Transaction    │─────►│ TransactionItem  │  │
//! │  │current_balance│     │ pricing snapshot │ owns │   (immutable)    │  │
//! │  └──────────────┘      └────────▲─────────┘      └──────────────────┘  │
//! │                                 │                                       │
//! │                        ┌────────┴─────────┐                             │
//! │                        │     Payment      │                             │
//! │                        └──────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every record has a UUID v4 `id` and relations are plain id strings. A
//! Transaction owns its items; movements and payments only point back at it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{Money, Rate};
use crate::pricing::PricingBreakdown;

/// `reference_type` written on stock movements caused by a transaction.
pub const REFERENCE_TRANSACTION: &str = "transaction";

// =============================================================================
// Enums
// =============================================================================

/// Whether a transaction sells to or buys from the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Sale,
    Purchase,
}

impl TransactionType {
    /// Stock moves out on a sale and in on a purchase.
    pub const fn stock_direction(&self) -> StockDirection {
        match self {
            TransactionType::Sale => StockDirection::Out,
            TransactionType::Purchase => StockDirection::In,
        }
    }

    /// Direction of the compensating movements written on cancellation.
    pub const fn reversal_direction(&self) -> StockDirection {
        match self {
            TransactionType::Sale => StockDirection::In,
            TransactionType::Purchase => StockDirection::Out,
        }
    }

    /// Capitalised name used in movement reasons ("Sale #...").
    pub const fn label(&self) -> &'static str {
        match self {
            TransactionType::Sale => "Sale",
            TransactionType::Purchase => "Purchase",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Purchase => "purchase",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
}

impl TransactionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of a transaction has been settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Partial,
    Paid,
    /// Settled on the client's account.
    Credit,
}

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `discount_value` is in basis points.
    Percentage,
    /// `discount_value` is in cents.
    Fixed,
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    /// Adds `quantity` to stock.
    In,
    /// Removes `quantity` from stock.
    Out,
    /// Sets stock to an absolute counted value.
    Adjustment,
}

impl StockDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockDirection::In => "in",
            StockDirection::Out => "out",
            StockDirection::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for StockDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Category
// =============================================================================

/// Product grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product that can be bought and sold.
///
/// `stock_quantity` only ever changes through stock movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub category_id: String,

    /// Display name.
    pub name: String,

    /// Stock Keeping Unit, unique across products.
    pub sku: String,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Purchase cost in cents.
    pub cost_cents: i64,

    /// Units on hand. Can go below zero through postings.
    pub stock_quantity: i64,

    /// Threshold at or below which the product counts as low on stock.
    pub min_stock_level: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost as a Money type.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock_level
    }

    /// Value of the stock on hand at cost. Negative stock counts as zero.
    pub fn stock_value(&self) -> Money {
        self.cost().multiply_quantity(self.stock_quantity.max(0))
    }
}

// =============================================================================
// Client
// =============================================================================

/// A customer or supplier with a running accrual balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub credit_limit_cents: i64,
    /// Amount the client owes. Sales add to it.
    pub current_balance_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }

    #[inline]
    pub fn credit_limit(&self) -> Money {
        Money::from_cents(self.credit_limit_cents)
    }

    /// True when the balance exceeds a non-zero credit limit.
    ///
    /// Postings never refuse a sale over it; they log a warning.
    pub fn is_over_credit_limit(&self) -> bool {
        self.credit_limit_cents > 0 && self.current_balance_cents > self.credit_limit_cents
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A posted sale or purchase with its frozen pricing snapshot.
///
/// Only `status`, `payment_status` and `notes` change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub client_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    pub payment_status: PaymentStatus,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub subtotal_cents: i64,
    pub discount_type: Option<DiscountType>,
    /// Basis points for percentage discounts, cents for fixed ones.
    pub discount_value: i64,
    pub discount_cents: i64,
    pub vat_enabled: bool,
    pub vat_rate_bps: i64,
    pub vat_cents: i64,
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Rebuilds the pricing breakdown stored on this transaction.
    pub fn pricing(&self) -> PricingBreakdown {
        let subtotal = Money::from_cents(self.subtotal_cents);
        let discount_amount = Money::from_cents(self.discount_cents);
        PricingBreakdown {
            subtotal,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            discount_amount,
            subtotal_after_discount: (subtotal - discount_amount).non_negative(),
            vat_enabled: self.vat_enabled,
            vat_rate: Rate::from_bps(self.vat_rate_bps.max(0) as u32),
            vat_amount: Money::from_cents(self.vat_cents),
            total_amount: self.total(),
        }
    }

    /// Reason text for stock movements caused by this transaction.
    pub fn movement_reason(&self) -> String {
        format!("{} #{}", self.kind.label(), self.id)
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line of a transaction. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// Position in the request, starting at 1.
    pub line_no: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// `quantity × unit_price_cents`.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl TransactionItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// A transaction item joined with the product it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItemDetail {
    pub id: String,
    pub product_id: String,
    pub product_sku: String,
    pub product_name: String,
    pub line_no: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// One append-only entry of a product's stock ledger.
///
/// ## Ledger Invariant
/// For every product, `stock_quantity` equals the sum of `delta` over its
/// movements, and each movement's `balance_after` is that running sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub direction: StockDirection,
    /// Magnitude of the change, always positive.
    pub quantity: i64,
    /// Signed change applied to `stock_quantity`.
    pub delta: i64,
    /// Stock level right after this movement.
    pub balance_after: i64,
    pub reason: String,
    /// What caused the movement, e.g. [`REFERENCE_TRANSACTION`].
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment
// =============================================================================

/// Money received or paid against a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub transaction_id: String,
    pub amount_cents: i64,
    /// Free text: "cash", "bank transfer", ...
    pub method: String,
    pub reference_number: Option<String>,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Composite Results
// =============================================================================

/// What a successful posting returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PostedTransaction {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

/// A transaction with everything a detail view shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionDetail {
    pub transaction: Transaction,
    pub client: Option<Client>,
    pub items: Vec<TransactionItemDetail>,
    pub payments: Vec<Payment>,
}

impl TransactionDetail {
    /// Sum of recorded payments.
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(Payment::amount).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
