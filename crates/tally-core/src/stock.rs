//! # Stock Rules
//!
//! Decides how a stock direction changes a product's quantity. The database
//! layer applies the result; nothing here touches storage.
//!
//! ## Directions
//! ```text
//! ┌──────────────┬───────────────────────────┬─────────────────────────────┐
//! │ direction    │ quantity means            │ delta                       │
//! ├──────────────┼───────────────────────────┼─────────────────────────────┤
//! │ in           │ units received            │ +quantity                   │
//! │ out          │ units removed             │ −quantity                   │
//! │ adjustment   │ counted stock level       │ quantity − current          │
//! └──────────────┴───────────────────────────┴─────────────────────────────┘
//! ```
//!
//! The floor (stock never below zero) only applies where the caller asks for
//! it: direct `out` adjustments always, sale postings when configured.

use crate::error::{CoreError, CoreResult};
use crate::types::StockDirection;

/// Whether a removal may take stock below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockFloor {
    /// Reject removals larger than the stock on hand.
    Enforce,
    /// Let stock go negative.
    Allow,
}

impl StockFloor {
    pub const fn from_enforced(enforce: bool) -> Self {
        if enforce {
            StockFloor::Enforce
        } else {
            StockFloor::Allow
        }
    }
}

/// A planned change to one product's stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockChange {
    pub direction: StockDirection,
    /// Magnitude recorded on the movement.
    pub quantity: i64,
    /// Signed change to apply.
    pub delta: i64,
    /// Stock after the change.
    pub balance_after: i64,
}

/// Plans a stock change for a product currently holding `current` units.
///
/// Returns `Ok(None)` when an adjustment sets stock to the level it already
/// has: there is nothing to record.
///
/// ## Errors
/// [`CoreError::InsufficientStock`] when `floor` is enforced and an `out`
/// would take stock below zero.
pub fn plan_change(
    sku: &str,
    current: i64,
    direction: StockDirection,
    quantity: i64,
    floor: StockFloor,
) -> CoreResult<Option<StockChange>> {
    let delta = match direction {
        StockDirection::In => quantity,
        StockDirection::Out => {
            if floor == StockFloor::Enforce && current < quantity {
                return Err(CoreError::InsufficientStock {
                    sku: sku.to_string(),
                    available: current,
                    requested: quantity,
                });
            }
            -quantity
        }
        StockDirection::Adjustment => quantity - current,
    };

    if delta == 0 && direction == StockDirection::Adjustment {
        return Ok(None);
    }

    Ok(Some(StockChange {
        direction,
        quantity: delta.abs(),
        delta,
        balance_after: current + delta,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_adds() {
        let change = plan_change("SKU", 10, StockDirection::In, 5, StockFloor::Enforce)
            .unwrap()
            .unwrap();
        assert_eq!(change.delta, 5);
        assert_eq!(change.quantity, 5);
        assert_eq!(change.balance_after, 15);
    }

    #[test]
    fn test_out_with_floor() {
        let change = plan_change("SKU", 10, StockDirection::Out, 10, StockFloor::Enforce)
            .unwrap()
            .unwrap();
        assert_eq!(change.delta, -10);
        assert_eq!(change.balance_after, 0);

        let err = plan_change("SKU", 3, StockDirection::Out, 5, StockFloor::Enforce).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_out_without_floor_goes_negative() {
        let change = plan_change("SKU", 3, StockDirection::Out, 5, StockFloor::Allow)
            .unwrap()
            .unwrap();
        assert_eq!(change.balance_after, -2);
    }

    #[test]
    fn test_adjustment_sets_absolute_level() {
        let down = plan_change("SKU", 10, StockDirection::Adjustment, 7, StockFloor::Enforce)
            .unwrap()
            .unwrap();
        assert_eq!(down.delta, -3);
        assert_eq!(down.quantity, 3);
        assert_eq!(down.balance_after, 7);

        let up = plan_change("SKU", -2, StockDirection::Adjustment, 4, StockFloor::Enforce)
            .unwrap()
            .unwrap();
        assert_eq!(up.delta, 6);
        assert_eq!(up.balance_after, 4);

        let zero = plan_change("SKU", 5, StockDirection::Adjustment, 0, StockFloor::Enforce)
            .unwrap()
            .unwrap();
        assert_eq!(zero.balance_after, 0);
    }

    #[test]
    fn test_adjustment_to_current_level_is_noop() {
        let change = plan_change("SKU", 7, StockDirection::Adjustment, 7, StockFloor::Enforce).unwrap();
        assert_eq!(change, None);
    }
}
