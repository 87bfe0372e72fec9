//! # Stock Adjuster
//!
//! Manual stock changes and inventory reporting.
//!
//! ## One Path for Every Stock Change
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  adjust_stock ─┐                                                        │
//! │  posting ──────┼──► tally_core::stock::plan_change   (pure decision)    │
//! │  cancellation ─┤             │                                          │
//! │  opening stock ┘             ▼                                          │
//! │                   write_stock_change (same DB transaction)              │
//! │                   ├── products.stock_quantity += delta  RETURNING       │
//! │                   └── INSERT stock_movements (delta, balance_after)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Because both writes always happen together, a product's stock equals the
//! sum of its movement deltas at every commit.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tally_core::request::StockAdjustment;
use tally_core::stock::{plan_change, StockChange, StockFloor};
use tally_core::validation::validate_stock_adjustment;
use tally_core::{Money, Product, StockMovement};

use super::{Ledger, LedgerError, LedgerResult};
use crate::repository::{movement, product};

/// Where a movement came from, for its `reference_type` / `reference_id`.
#[derive(Debug, Clone, Copy)]
pub(super) struct MovementSource<'a> {
    pub reason: &'a str,
    pub reference: Option<(&'a str, &'a str)>,
}

/// Applies a planned change to the product row and appends its movement.
///
/// `balance_after` is the level the UPDATE returned, not the planned one.
pub(super) async fn write_stock_change(
    conn: &mut SqliteConnection,
    product_id: &str,
    change: StockChange,
    source: MovementSource<'_>,
    now: DateTime<Utc>,
) -> LedgerResult<StockMovement> {
    let balance_after = product::apply_delta(&mut *conn, product_id, change.delta, now).await?;

    let movement = StockMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        direction: change.direction,
        quantity: change.quantity,
        delta: change.delta,
        balance_after,
        reason: source.reason.to_string(),
        reference_type: source.reference.map(|(kind, _)| kind.to_string()),
        reference_id: source.reference.map(|(_, id)| id.to_string()),
        created_at: now,
    };
    movement::insert(&mut *conn, &movement).await?;

    Ok(movement)
}

impl Ledger {
    /// Applies a manual stock change to one product and records it.
    ///
    /// ## Directions
    /// - `in`: adds `quantity`
    /// - `out`: removes `quantity`; fails with `InsufficientStock` rather
    ///   than go below zero
    /// - `adjustment`: sets stock to `quantity` (a physical count); writes
    ///   nothing when stock already has that level
    ///
    /// ## Returns
    /// The product as it is after the change.
    #[instrument(
        skip_all,
        fields(
            instance_id = %self.config.instance_id,
            pid = std::process::id(),
            product_id = %product_id,
            direction = %adjustment.direction,
            quantity = adjustment.quantity,
        )
    )]
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        adjustment: &StockAdjustment,
    ) -> LedgerResult<Product> {
        if let Err(err) = validate_stock_adjustment(adjustment) {
            warn!(error = %err, "Rejected stock adjustment");
            return Err(err.into());
        }

        let mut tx = self.pool.begin().await?;

        let current = product::lock(&mut *tx, product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", product_id))?;
        let now = Utc::now();

        let planned = plan_change(
            &current.sku,
            current.stock_quantity,
            adjustment.direction,
            adjustment.quantity,
            StockFloor::Enforce,
        );
        let change = match planned {
            Ok(change) => change,
            Err(err) => {
                warn!(error = %err, "Rejected stock adjustment");
                return Err(err.into());
            }
        };

        let Some(change) = change else {
            info!(stock = current.stock_quantity, "Stock already at counted level");
            tx.commit().await?;
            return Ok(current);
        };

        let source = MovementSource {
            reason: adjustment.reason_or_default(),
            reference: None,
        };
        let movement = write_stock_change(&mut *tx, product_id, change, source, now).await?;

        let updated = product::find(&mut *tx, product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", product_id))?;

        tx.commit().await?;

        info!(
            sku = %updated.sku,
            delta = movement.delta,
            stock = updated.stock_quantity,
            "Stock adjusted"
        );

        Ok(updated)
    }

    /// Every movement of a product, oldest first.
    #[instrument(level = "debug", skip_all, fields(instance_id = %self.config.instance_id, product_id = %product_id))]
    pub async fn stock_history(&self, product_id: &str) -> LedgerResult<Vec<StockMovement>> {
        self.require_product(product_id).await?;
        Ok(movement::history(&self.pool, product_id).await?)
    }

    /// Stock level of a product as of `at`, rebuilt from its movements.
    #[instrument(level = "debug", skip_all, fields(instance_id = %self.config.instance_id, product_id = %product_id))]
    pub async fn stock_at(&self, product_id: &str, at: DateTime<Utc>) -> LedgerResult<i64> {
        self.require_product(product_id).await?;
        Ok(movement::balance_at(&self.pool, product_id, at).await?)
    }

    /// Products at or below their minimum stock level.
    pub async fn low_stock_products(&self) -> LedgerResult<Vec<Product>> {
        Ok(product::list_low_stock(&self.pool).await?)
    }

    /// Value of all stock on hand at cost.
    pub async fn stock_value(&self) -> LedgerResult<Money> {
        Ok(product::stock_value(&self.pool).await?)
    }

    async fn require_product(&self, product_id: &str) -> LedgerResult<Product> {
        product::find(&self.pool, product_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Product", product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ledger, seed_category, seed_product};
    use super::*;
    use tally_core::StockDirection;

    #[tokio::test]
    async fn test_in_and_out() {
        let (db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 5).await;

        let after_in = ledger
            .adjust_stock(&rice.id, &StockAdjustment::new(StockDirection::In, 10).with_reason("Delivery"))
            .await
            .unwrap();
        assert_eq!(after_in.stock_quantity, 15);

        let after_out = ledger
            .adjust_stock(&rice.id, &StockAdjustment::new(StockDirection::Out, 15))
            .await
            .unwrap();
        assert_eq!(after_out.stock_quantity, 0);

        let history = ledger.stock_history(&rice.id).await.unwrap();
        let deltas: Vec<i64> = history.iter().map(|m| m.delta).collect();
        assert_eq!(deltas, vec![5, 10, -15]);
        assert_eq!(history[1].reason, "Delivery");
        assert_eq!(history[2].reason, "Manual adjustment");
        assert_eq!(history[2].balance_after, 0);
        assert_eq!(db.movements().sum_deltas(&rice.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_out_beyond_stock_is_rejected_and_nothing_changes() {
        let (db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 5).await;

        let err = ledger
            .adjust_stock(&rice.id, &StockAdjustment::new(StockDirection::Out, 10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock {
                available: 5,
                requested: 10,
                ..
            }
        ));

        let product = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 5);
        assert_eq!(ledger.stock_history(&rice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_adjustment_sets_counted_level() {
        let (_db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 12).await;

        let counted = ledger
            .adjust_stock(
                &rice.id,
                &StockAdjustment::new(StockDirection::Adjustment, 9).with_reason("Stock count"),
            )
            .await
            .unwrap();
        assert_eq!(counted.stock_quantity, 9);

        let history = ledger.stock_history(&rice.id).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.direction, StockDirection::Adjustment);
        assert_eq!(last.quantity, 3);
        assert_eq!(last.delta, -3);
        assert_eq!(last.balance_after, 9);

        let zeroed = ledger
            .adjust_stock(&rice.id, &StockAdjustment::new(StockDirection::Adjustment, 0))
            .await
            .unwrap();
        assert_eq!(zeroed.stock_quantity, 0);
    }

    #[tokio::test]
    async fn test_adjustment_to_same_level_writes_nothing() {
        let (_db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 4).await;

        let product = ledger
            .adjust_stock(&rice.id, &StockAdjustment::new(StockDirection::Adjustment, 4))
            .await
            .unwrap();
        assert_eq!(product.stock_quantity, 4);
        assert_eq!(ledger.stock_history(&rice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_product_and_bad_quantity() {
        let (_db, ledger) = ledger().await;

        let missing = Uuid::new_v4().to_string();
        let err = ledger
            .adjust_stock(&missing, &StockAdjustment::new(StockDirection::In, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));

        let err = ledger
            .adjust_stock(&missing, &StockAdjustment::new(StockDirection::In, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_stock_at_rebuilds_past_levels() {
        let (_db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 0).await;

        let before_any = Utc::now();
        assert_eq!(ledger.stock_at(&rice.id, before_any).await.unwrap(), 0);

        ledger
            .adjust_stock(&rice.id, &StockAdjustment::new(StockDirection::In, 8))
            .await
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let after_first = Utc::now();
        std::thread::sleep(std::time::Duration::from_millis(5));

        ledger
            .adjust_stock(&rice.id, &StockAdjustment::new(StockDirection::Out, 3))
            .await
            .unwrap();

        assert_eq!(ledger.stock_at(&rice.id, after_first).await.unwrap(), 8);
        assert_eq!(ledger.stock_at(&rice.id, Utc::now()).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_low_stock_and_value() {
        let (_db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 2).await;
        seed_product(&ledger, &category.id, "OIL-1L", 500, 300, 40).await;

        let low = ledger.low_stock_products().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, rice.id);

        // 2 × 7.00 + 40 × 3.00
        assert_eq!(ledger.stock_value().await.unwrap().cents(), 13_400);
    }
}
