//! # Transaction Poster
//!
//! Posts a sale or purchase with all of its side effects as one unit.
//!
//! ## Posting Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate request                     (no database access yet)          │
//! │  price line items                     (pure)                            │
//! │       │                                                                 │
//! │  BEGIN ───────────────────────────────────────────────────────────────  │
//! │       │                                                                 │
//! │  lock client (if any)          ── unknown → NotFound, rollback          │
//! │  lock every product            ── unknown → NotFound, rollback          │
//! │  read the clock                (timestamps follow commit order)         │
//! │  INSERT transactions           (pricing snapshot)                       │
//! │  for each line, in order:                                               │
//! │     INSERT transaction_items                                            │
//! │     stock: sale → out, purchase → in   (write_stock_change)             │
//! │  sale with client: balance += total    (warn past the credit limit)     │
//! │       │                                                                 │
//! │  COMMIT ──────────────────────────────────────────────────────────────  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Any error drops the open `sqlx` transaction, which rolls back every write
//! made so far. Stock may go negative on sales unless
//! [`LedgerConfig::enforce_stock_on_posting`](super::LedgerConfig) is set.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tally_core::pricing::price;
use tally_core::request::TransactionRequest;
use tally_core::stock::{plan_change, StockFloor};
use tally_core::validation::validate_transaction_request;
use tally_core::{
    Client, PostedTransaction, Transaction, TransactionItem, TransactionType,
    REFERENCE_TRANSACTION,
};

use super::stock::{write_stock_change, MovementSource};
use super::{Ledger, LedgerError, LedgerResult};
use crate::repository::{client, product, transaction};

impl Ledger {
    /// Posts a transaction: header, items, stock movements and the client
    /// balance change, all or nothing.
    ///
    /// ## Errors
    /// * `Validation` - malformed request, nothing touched
    /// * `NotFound` - unknown client or product, everything rolled back
    /// * `InsufficientStock` - only with the posting stock floor enabled
    /// * `Store` - the database failed, everything rolled back
    #[instrument(
        skip_all,
        fields(
            instance_id = %self.config.instance_id,
            pid = std::process::id(),
            kind = %request.kind,
            items = request.items.len(),
        )
    )]
    pub async fn post_transaction(
        &self,
        request: &TransactionRequest,
    ) -> LedgerResult<PostedTransaction> {
        if let Err(err) = validate_transaction_request(request) {
            warn!(error = %err, "Rejected transaction request");
            return Err(err.into());
        }

        let pricing = price(&request.pricing_input());
        let direction = request.kind.stock_direction();
        let floor = StockFloor::from_enforced(
            self.config.enforce_stock_on_posting && request.kind == TransactionType::Sale,
        );

        let mut tx = self.pool.begin().await?;

        let locked_client = match &request.client_id {
            Some(client_id) => Some(
                client::lock(&mut *tx, client_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("Client", client_id.as_str()))?,
            ),
            None => None,
        };

        // product_id → (sku, stock as this posting has left it)
        let mut stock: HashMap<&str, (String, i64)> = HashMap::new();
        for line in &request.items {
            if stock.contains_key(line.product_id.as_str()) {
                continue;
            }
            let locked = product::lock(&mut *tx, &line.product_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Product", line.product_id.as_str()))?;
            stock.insert(line.product_id.as_str(), (locked.sku, locked.stock_quantity));
        }

        // Read under the write lock so created_at never runs behind commit order.
        let now = Utc::now();

        let header = Transaction {
            id: Uuid::new_v4().to_string(),
            client_id: request.client_id.clone(),
            kind: request.kind,
            status: request.status,
            payment_status: request.payment_status,
            date: request.date,
            notes: request.notes.clone(),
            subtotal_cents: pricing.subtotal.cents(),
            discount_type: pricing.discount_type,
            discount_value: pricing.discount_value,
            discount_cents: pricing.discount_amount.cents(),
            vat_enabled: pricing.vat_enabled,
            vat_rate_bps: pricing.vat_rate.bps() as i64,
            vat_cents: pricing.vat_amount.cents(),
            total_cents: pricing.total_amount.cents(),
            created_at: now,
            updated_at: now,
        };
        transaction::insert(&mut *tx, &header).await?;

        let reason = header.movement_reason();
        let source = MovementSource {
            reason: &reason,
            reference: Some((REFERENCE_TRANSACTION, &header.id)),
        };

        let mut items = Vec::with_capacity(request.items.len());
        for (index, line) in request.items.iter().enumerate() {
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: header.id.clone(),
                product_id: line.product_id.clone(),
                line_no: index as i64 + 1,
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                line_total_cents: line.line_total().cents(),
                created_at: now,
            };
            transaction::insert_item(&mut *tx, &item).await?;

            let (sku, level) = stock
                .get_mut(line.product_id.as_str())
                .ok_or_else(|| LedgerError::not_found("Product", line.product_id.as_str()))?;

            let planned = plan_change(sku, *level, direction, line.quantity, floor);
            let change = match planned {
                Ok(change) => change,
                Err(err) => {
                    warn!(error = %err, "Rejected transaction: stock floor");
                    return Err(err.into());
                }
            };
            if let Some(change) = change {
                let movement =
                    write_stock_change(&mut *tx, &line.product_id, change, source, now).await?;
                *level = movement.balance_after;
            }

            items.push(item);
        }

        if let Some(locked) = locked_client.filter(|_| header.kind == TransactionType::Sale) {
            let balance =
                client::apply_balance_delta(&mut *tx, &locked.id, header.total_cents, now).await?;
            let updated = Client {
                current_balance_cents: balance,
                ..locked
            };
            if updated.is_over_credit_limit() {
                warn!(
                    client_id = %updated.id,
                    balance = %updated.balance(),
                    credit_limit = %updated.credit_limit(),
                    "Sale takes client past credit limit"
                );
            }
        }

        tx.commit().await?;

        info!(
            transaction_id = %header.id,
            total = %header.total(),
            items = items.len(),
            "Transaction posted"
        );

        Ok(PostedTransaction {
            transaction: header,
            items,
        })
    }
}
