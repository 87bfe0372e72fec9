//! Inputs accepted by the ledger operations.
//!
//! These are plain data. Validation lives in [`crate::validation`], pricing
//! in [`crate::pricing`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Rate};
use crate::pricing::PricingInput;
use crate::types::{DiscountType, PaymentStatus, StockDirection, TransactionStatus, TransactionType};

// =============================================================================
// Line Items and Pricing Settings
// =============================================================================

/// One requested line of a transaction.
///
/// The unit price is the price for this transaction and may differ from the
/// product's list price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Requested discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountSpec {
    /// Percentage of the subtotal, at most 100%.
    Percentage(Rate),
    /// Fixed amount, capped at the subtotal.
    Fixed(Money),
}

impl DiscountSpec {
    pub const fn discount_type(&self) -> DiscountType {
        match self {
            DiscountSpec::Percentage(_) => DiscountType::Percentage,
            DiscountSpec::Fixed(_) => DiscountType::Fixed,
        }
    }

    /// Basis points for a percentage, cents for a fixed amount.
    pub const fn value(&self) -> i64 {
        match self {
            DiscountSpec::Percentage(rate) => rate.bps() as i64,
            DiscountSpec::Fixed(amount) => amount.cents(),
        }
    }
}

/// VAT settings for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatSpec {
    pub enabled: bool,
    pub rate: Rate,
}

impl VatSpec {
    pub const fn enabled(rate: Rate) -> Self {
        Self {
            enabled: true,
            rate,
        }
    }

    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            rate: Rate::zero(),
        }
    }
}

// =============================================================================
// Transaction Requests
// =============================================================================

/// Request to post a sale or purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionRequest {
    pub client_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub items: Vec<LineItem>,
    pub discount: Option<DiscountSpec>,
    pub discount_amount: Option<Money>,
    pub vat: Option<VatSpec>,
    pub vat_amount: Option<Money>,
    pub total_amount: Option<Money>,
}

impl TransactionRequest {
    /// A completed, unpaid transaction with no client, discount or VAT.
    pub fn new(kind: TransactionType, date: NaiveDate, items: Vec<LineItem>) -> Self {
        Self {
            client_id: None,
            kind,
            status: TransactionStatus::default(),
            payment_status: PaymentStatus::default(),
            date,
            notes: None,
            items,
            discount: None,
            discount_amount: None,
            vat: None,
            vat_amount: None,
            total_amount: None,
        }
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = payment_status;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_discount(mut self, discount: DiscountSpec) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn with_vat(mut self, rate: Rate) -> Self {
        self.vat = Some(VatSpec::enabled(rate));
        self
    }

    /// Borrowed view for the pricing calculator.
    pub fn pricing_input(&self) -> PricingInput<'_> {
        PricingInput {
            items: &self.items,
            discount: self.discount,
            discount_amount: self.discount_amount,
            vat: self.vat,
            vat_amount: self.vat_amount,
            total_amount: self.total_amount,
        }
    }
}

/// Fields of a posted transaction that may still change.
///
/// `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionUpdate {
    pub status: Option<TransactionStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.payment_status.is_none() && self.notes.is_none()
    }
}

/// Filter for listing transactions. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionFilter {
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub client_id: Option<String>,
    pub status: Option<TransactionStatus>,
}

// =============================================================================
// Stock and Payments
// =============================================================================

/// A manual stock change.
///
/// For [`StockDirection::Adjustment`] the quantity is the counted stock
/// level to set, not a difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub direction: StockDirection,
    pub quantity: i64,
    pub reason: Option<String>,
}

impl StockAdjustment {
    pub fn new(direction: StockDirection, quantity: i64) -> Self {
        Self {
            direction,
            quantity,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// The reason to record, falling back to "Manual adjustment".
    pub fn reason_or_default(&self) -> &str {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("Manual adjustment")
    }
}

/// A payment to record against a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPayment {
    pub amount: Money,
    pub method: String,
    pub reference_number: Option<String>,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
}

// =============================================================================
// Catalogue and Clients
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// A product to create. A non-zero `stock_quantity` is booked as an
/// opening stock movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub category_id: String,
    pub name: String,
    pub sku: String,
    pub price: Money,
    pub cost: Money,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClient {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub credit_limit: Money,
    /// Opening balance.
    #[serde(default)]
    pub current_balance: Money,
}

impl NewClient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_spec_json_shape() {
        let json = serde_json::to_value(DiscountSpec::Percentage(Rate::from_bps(1000))).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "percentage", "value": 1000 }));

        let parsed: DiscountSpec =
            serde_json::from_value(serde_json::json!({ "type": "fixed", "value": 250 })).unwrap();
        assert_eq!(parsed, DiscountSpec::Fixed(Money::from_cents(250)));
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: TransactionRequest = serde_json::from_value(serde_json::json!({
            "client_id": null,
            "type": "purchase",
            "date": "2026-03-01",
            "notes": null,
            "items": [{ "product_id": "p-1", "quantity": 5, "unit_price": 700 }],
            "discount": null,
            "discount_amount": null,
            "vat": null,
            "vat_amount": null,
            "total_amount": null
        }))
        .unwrap();

        assert_eq!(req.kind, TransactionType::Purchase);
        assert_eq!(req.status, TransactionStatus::Completed);
        assert_eq!(req.payment_status, PaymentStatus::Unpaid);
        assert_eq!(req.items[0].line_total().cents(), 3500);
    }

    #[test]
    fn test_adjustment_reason_fallback() {
        let adj = StockAdjustment::new(StockDirection::In, 3);
        assert_eq!(adj.reason_or_default(), "Manual adjustment");
        assert_eq!(adj.with_reason("  ").reason_or_default(), "Manual adjustment");
        assert_eq!(
            StockAdjustment::new(StockDirection::Out, 1)
                .with_reason("Damaged")
                .reason_or_default(),
            "Damaged"
        );
    }
}
