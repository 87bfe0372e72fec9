//! # Pricing Calculator
//!
//! Turns line items plus discount and VAT settings into the amounts stored
//! on a transaction.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   subtotal = Σ quantity × unit_price                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   discount = supplied amount (capped at subtotal)                       │
//! │            │ percentage: round_half_up(subtotal × bps / 10000)          │
//! │            │ fixed:      min(value, subtotal)                           │
//! │            │ none:       0                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   after discount = subtotal − discount        (never negative)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   vat = 0 when disabled                                                 │
//! │       │ supplied amount when given                                      │
//! │       │ round_half_up(after discount × bps / 10000) otherwise           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │   total = supplied total, or after discount + vat                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A supplied amount of zero counts as "not supplied" for discount and VAT.
//! A supplied total is taken as-is, zero included.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Rate};
use crate::request::{DiscountSpec, LineItem, VatSpec};
use crate::types::DiscountType;

// =============================================================================
// Input
// =============================================================================

/// Everything the calculator looks at.
#[derive(Debug, Clone, Copy)]
pub struct PricingInput<'a> {
    pub items: &'a [LineItem],
    pub discount: Option<DiscountSpec>,
    /// Precomputed discount that overrides the derived one.
    pub discount_amount: Option<Money>,
    pub vat: Option<VatSpec>,
    /// Precomputed VAT that overrides the derived one.
    pub vat_amount: Option<Money>,
    /// Precomputed total that overrides the derived one.
    pub total_amount: Option<Money>,
}

impl<'a> PricingInput<'a> {
    /// Input with no discount, no VAT and no overrides.
    pub fn new(items: &'a [LineItem]) -> Self {
        Self {
            items,
            discount: None,
            discount_amount: None,
            vat: None,
            vat_amount: None,
            total_amount: None,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// The pricing snapshot frozen onto a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingBreakdown {
    pub subtotal: Money,
    pub discount_type: Option<DiscountType>,
    /// Basis points for percentage discounts, cents for fixed ones, 0 otherwise.
    pub discount_value: i64,
    pub discount_amount: Money,
    pub subtotal_after_discount: Money,
    pub vat_enabled: bool,
    pub vat_rate: Rate,
    pub vat_amount: Money,
    pub total_amount: Money,
}

// =============================================================================
// Calculator
// =============================================================================

/// Sum of `quantity × unit_price` over all lines.
pub fn subtotal(items: &[LineItem]) -> Money {
    items.iter().map(LineItem::line_total).sum()
}

/// Discount derived from a discount spec, before any override.
pub fn discount_for(subtotal: Money, spec: Option<DiscountSpec>) -> Money {
    match spec {
        Some(DiscountSpec::Percentage(rate)) => subtotal.percentage(rate),
        Some(DiscountSpec::Fixed(amount)) => amount.min(subtotal),
        None => Money::zero(),
    }
}

/// Computes the full pricing breakdown.
///
/// Pure: the same input always gives the same output. Inputs are expected
/// to have passed [`crate::validation::validate_transaction_request`], so
/// quantities, prices and rates are non-negative and bounded by
/// [`crate::MAX_ITEM_QUANTITY`] and [`crate::MAX_MONEY_CENTS`]. Within those
/// bounds no step can overflow.
pub fn price(input: &PricingInput<'_>) -> PricingBreakdown {
    let subtotal = subtotal(input.items);

    let discount_amount = match input.discount_amount.filter(|m| !m.is_zero()) {
        Some(supplied) => supplied.min(subtotal),
        None => discount_for(subtotal, input.discount),
    };
    let subtotal_after_discount = (subtotal - discount_amount).non_negative();

    let (vat_enabled, vat_rate) = match input.vat {
        Some(spec) if spec.enabled => (true, spec.rate),
        _ => (false, Rate::zero()),
    };
    let vat_amount = if !vat_enabled {
        Money::zero()
    } else {
        match input.vat_amount.filter(|m| !m.is_zero()) {
            Some(supplied) => supplied,
            None if vat_rate.is_zero() => Money::zero(),
            None => subtotal_after_discount.percentage(vat_rate),
        }
    };

    let total_amount = input
        .total_amount
        .unwrap_or(subtotal_after_discount + vat_amount);

    PricingBreakdown {
        subtotal,
        discount_type: input.discount.as_ref().map(DiscountSpec::discount_type),
        discount_value: input.discount.as_ref().map_or(0, DiscountSpec::value),
        discount_amount,
        subtotal_after_discount,
        vat_enabled,
        vat_rate,
        vat_amount,
        total_amount,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
