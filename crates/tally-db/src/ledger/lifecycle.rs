//! # Transaction Lifecycle
//!
//! What can happen to a transaction after it is posted.
//!
//! ## Status Changes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ◄──────────► completed        update_transaction              │
//! │      │                     │                                            │
//! │      └─────────┬───────────┘                                            │
//! │                ▼                                                        │
//! │            cancelled                    cancel_transaction only         │
//! │                                         (terminal)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancelling never rewrites history. It appends one inverse movement per
//! item and, for a sale with a client, takes the total back off the
//! client's balance.

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tally_core::request::{NewPayment, TransactionUpdate};
use tally_core::stock::{plan_change, StockFloor};
use tally_core::validation::{validate_note, validate_payment, validate_transaction_update};
use tally_core::{
    Payment, Transaction, TransactionStatus, TransactionType, REFERENCE_TRANSACTION,
};

use super::stock::{write_stock_change, MovementSource};
use super::{Ledger, LedgerError, LedgerResult};
use crate::repository::{client, payment, product, transaction};

fn ensure_not_cancelled(transaction: &Transaction) -> LedgerResult<()> {
    if transaction.status == TransactionStatus::Cancelled {
        return Err(LedgerError::InvalidTransactionStatus {
            transaction_id: transaction.id.clone(),
            status: transaction.status,
        });
    }
    Ok(())
}

impl Ledger {
    /// Updates status, payment status or notes of a transaction.
    ///
    /// Pricing and items never change after posting.
    #[instrument(
        skip_all,
        fields(instance_id = %self.config.instance_id, pid = std::process::id(), transaction_id = %id)
    )]
    pub async fn update_transaction(
        &self,
        id: &str,
        update: &TransactionUpdate,
    ) -> LedgerResult<Transaction> {
        if let Err(err) = validate_transaction_update(update) {
            warn!(error = %err, "Rejected transaction update");
            return Err(err.into());
        }

        let mut tx = self.pool.begin().await?;

        let current = transaction::lock(&mut *tx, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;
        let now = Utc::now();
        ensure_not_cancelled(&current)?;

        if update.is_empty() {
            tx.commit().await?;
            return Ok(current);
        }

        let updated = transaction::update_fields(&mut *tx, id, update, now)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;

        tx.commit().await?;

        info!(
            status = %updated.status,
            payment_status = ?updated.payment_status,
            "Transaction updated"
        );
        Ok(updated)
    }

    /// Cancels a transaction with compensating entries.
    ///
    /// ## Effects
    /// - one movement per item in the opposite direction (sale items come
    ///   back `in`, purchase items go `out`), with no stock floor
    /// - sale with a client: balance reduced by the total
    /// - status set to `cancelled`
    ///
    /// ## Errors
    /// * `NotFound` - unknown transaction
    /// * `InvalidTransactionStatus` - already cancelled
    #[instrument(
        skip_all,
        fields(instance_id = %self.config.instance_id, pid = std::process::id(), transaction_id = %id)
    )]
    pub async fn cancel_transaction(
        &self,
        id: &str,
        reason: Option<&str>,
    ) -> LedgerResult<Transaction> {
        validate_note("reason", reason)?;

        let mut tx = self.pool.begin().await?;

        let current = transaction::lock(&mut *tx, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;
        let now = Utc::now();
        if let Err(err) = ensure_not_cancelled(&current) {
            warn!("Transaction already cancelled");
            return Err(err);
        }

        let movement_reason = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => format!("Cancelled {}: {reason}", current.movement_reason()),
            None => format!("Cancelled {}", current.movement_reason()),
        };
        let source = MovementSource {
            reason: &movement_reason,
            reference: Some((REFERENCE_TRANSACTION, &current.id)),
        };
        let direction = current.kind.reversal_direction();

        let items = transaction::items(&mut *tx, id).await?;
        for item in &items {
            let locked = product::lock(&mut *tx, &item.product_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Product", item.product_id.as_str()))?;

            let change = plan_change(
                &locked.sku,
                locked.stock_quantity,
                direction,
                item.quantity,
                StockFloor::Allow,
            )?;
            if let Some(change) = change {
                write_stock_change(&mut *tx, &item.product_id, change, source, now).await?;
            }
        }

        if current.kind == TransactionType::Sale {
            if let Some(client_id) = &current.client_id {
                client::apply_balance_delta(&mut *tx, client_id, -current.total_cents, now)
                    .await?;
            }
        }

        let cancelled = transaction::set_status(&mut *tx, id, TransactionStatus::Cancelled, now)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;

        tx.commit().await?;

        info!(items = items.len(), total = %cancelled.total(), "Transaction cancelled");
        Ok(cancelled)
    }

    /// Records a payment against a transaction.
    ///
    /// Only inserts the payment row; the transaction's payment status is
    /// left to the caller.
    #[instrument(
        skip_all,
        fields(
            instance_id = %self.config.instance_id,
            pid = std::process::id(),
            transaction_id = %transaction_id,
            amount = %new.amount,
        )
    )]
    pub async fn record_payment(
        &self,
        transaction_id: &str,
        new: &NewPayment,
    ) -> LedgerResult<Payment> {
        if let Err(err) = validate_payment(new) {
            warn!(error = %err, "Rejected payment");
            return Err(err.into());
        }

        let mut tx = self.pool.begin().await?;

        let current = transaction::lock(&mut *tx, transaction_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", transaction_id))?;
        let now = Utc::now();
        ensure_not_cancelled(&current)?;

        let recorded = Payment {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.to_string(),
            amount_cents: new.amount.cents(),
            method: new.method.trim().to_string(),
            reference_number: new.reference_number.clone(),
            date: new.date,
            notes: new.notes.clone(),
            created_at: now,
        };
        payment::insert(&mut *tx, &recorded).await?;

        tx.commit().await?;

        info!(payment_id = %recorded.id, "Payment recorded");
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ledger, seed_category, seed_client, seed_product, today};
    use super::super::ErrorCode;
    use super::*;
    use tally_core::request::{LineItem, TransactionRequest};
    use tally_core::{Money, PaymentStatus, StockDirection};

    fn cash(cents: i64) -> NewPayment {
        NewPayment {
            amount: Money::from_cents(cents),
            method: "cash".to_string(),
            reference_number: None,
            date: today(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_update_mutable_fields() {
        let (_db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 10).await;

        let posted = ledger
            .post_transaction(
                &TransactionRequest::new(
                    TransactionType::Sale,
                    today(),
                    vec![LineItem::new(&rice.id, 1, Money::from_cents(1000))],
                )
                .with_status(TransactionStatus::Pending),
            )
            .await
            .unwrap();

        let updated = ledger
            .update_transaction(
                &posted.transaction.id,
                &TransactionUpdate {
                    status: Some(TransactionStatus::Completed),
                    payment_status: Some(PaymentStatus::Paid),
                    notes: Some("Paid at counter".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, TransactionStatus::Completed);
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
        assert_eq!(updated.notes.as_deref(), Some("Paid at counter"));
        assert_eq!(updated.total_cents, posted.transaction.total_cents);

        // Unset fields stay as they are.
        let again = ledger
            .update_transaction(
                &posted.transaction.id,
                &TransactionUpdate {
                    status: Some(TransactionStatus::Pending),
                    ..TransactionUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(again.payment_status, PaymentStatus::Paid);
        assert_eq!(again.notes.as_deref(), Some("Paid at counter"));
    }

    #[tokio::test]
    async fn test_update_cannot_cancel() {
        let (_db, ledger) = ledger().await;

        let err = ledger
            .update_transaction(
                "any",
                &TransactionUpdate {
                    status: Some(TransactionStatus::Cancelled),
                    ..TransactionUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cancel_sale_compensates_stock_and_balance() {
        let (db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 10).await;
        let oil = seed_product(&ledger, &category.id, "OIL-1L", 500, 300, 1).await;
        let client = seed_client(&ledger, "Ahmed Traders", 5000).await;

        let posted = ledger
            .post_transaction(
                &TransactionRequest::new(
                    TransactionType::Sale,
                    today(),
                    vec![
                        LineItem::new(&rice.id, 4, Money::from_cents(1000)),
                        LineItem::new(&oil.id, 3, Money::from_cents(500)),
                    ],
                )
                .with_client(&client.id),
            )
            .await
            .unwrap();
        let id = posted.transaction.id.clone();

        let cancelled = ledger
            .cancel_transaction(&id, Some("Customer returned goods"))
            .await
            .unwrap();
        assert_eq!(cancelled.status, TransactionStatus::Cancelled);
        assert_eq!(cancelled.total_cents, 5500);

        let rice_now = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        let oil_now = db.products().get_by_id(&oil.id).await.unwrap().unwrap();
        assert_eq!(rice_now.stock_quantity, 10);
        assert_eq!(oil_now.stock_quantity, 1);

        let client_now = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(client_now.current_balance_cents, 5000);

        // Original movements stay; inverses are appended.
        let movements = db
            .movements()
            .for_reference(REFERENCE_TRANSACTION, &id)
            .await
            .unwrap();
        assert_eq!(movements.len(), 4);
        let reversals: Vec<_> = movements
            .iter()
            .filter(|m| m.direction == StockDirection::In)
            .collect();
        assert_eq!(reversals.len(), 2);
        assert_eq!(
            reversals[0].reason,
            format!("Cancelled Sale #{id}: Customer returned goods")
        );
        assert_eq!(
            db.movements().sum_deltas(&oil.id).await.unwrap(),
            oil_now.stock_quantity
        );
    }

    #[tokio::test]
    async fn test_cancel_purchase_removes_stock_below_zero() {
        let (db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 0).await;

        let posted = ledger
            .post_transaction(&TransactionRequest::new(
                TransactionType::Purchase,
                today(),
                vec![LineItem::new(&rice.id, 6, Money::from_cents(700))],
            ))
            .await
            .unwrap();

        // Part of the delivery is sold before the purchase is cancelled.
        ledger
            .post_transaction(&TransactionRequest::new(
                TransactionType::Sale,
                today(),
                vec![LineItem::new(&rice.id, 4, Money::from_cents(1000))],
            ))
            .await
            .unwrap();

        ledger
            .cancel_transaction(&posted.transaction.id, None)
            .await
            .unwrap();

        let product = db.products().get_by_id(&rice.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, -4);

        let history = db.movements().history(&rice.id).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.direction, StockDirection::Out);
        assert_eq!(last.reason, format!("Cancelled Purchase #{}", posted.transaction.id));
    }

    #[tokio::test]
    async fn test_cancelled_is_terminal() {
        let (_db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 10).await;

        let posted = ledger
            .post_transaction(&TransactionRequest::new(
                TransactionType::Sale,
                today(),
                vec![LineItem::new(&rice.id, 1, Money::from_cents(1000))],
            ))
            .await
            .unwrap();
        let id = posted.transaction.id;
        ledger.cancel_transaction(&id, None).await.unwrap();

        let err = ledger.cancel_transaction(&id, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BusinessLogic);

        let err = ledger
            .update_transaction(
                &id,
                &TransactionUpdate {
                    notes: Some("late note".to_string()),
                    ..TransactionUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransactionStatus {
                status: TransactionStatus::Cancelled,
                ..
            }
        ));

        let err = ledger.record_payment(&id, &cash(100)).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransactionStatus { .. }));
    }

    #[tokio::test]
    async fn test_record_payment() {
        let (db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 10).await;

        let posted = ledger
            .post_transaction(&TransactionRequest::new(
                TransactionType::Sale,
                today(),
                vec![LineItem::new(&rice.id, 3, Money::from_cents(1000))],
            ))
            .await
            .unwrap();
        let id = posted.transaction.id;

        ledger.record_payment(&id, &cash(1000)).await.unwrap();
        ledger.record_payment(&id, &cash(500)).await.unwrap();

        assert_eq!(db.payments().get_total_paid(&id).await.unwrap().cents(), 1500);

        // Reconciliation is left to the caller.
        let header = db.transactions().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(header.payment_status, PaymentStatus::Unpaid);

        let err = ledger.record_payment(&id, &cash(0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = ledger.record_payment("missing", &cash(100)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
