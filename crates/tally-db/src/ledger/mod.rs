//! # Ledger Service
//!
//! The atomic operations of the back office. Each write runs in exactly one
//! database transaction.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  posting     post_transaction                                           │
//! │  lifecycle   update_transaction, cancel_transaction, record_payment     │
//! │  stock       adjust_stock, stock_history, stock_at,                     │
//! │              low_stock_products, stock_value                            │
//! │  balance     adjust_client_balance, set_client_balance                  │
//! │  catalog     create_category, create_product, create_client             │
//! │  (here)      get_transaction, list_transactions                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! SQLite has no `SELECT ... FOR UPDATE`. Rows an operation depends on are
//! locked with a no-op `UPDATE ... RETURNING`, which takes the database write
//! lock at the first read. Concurrent writers wait on `busy_timeout` instead
//! of reading values that are about to change.

mod balance;
mod catalog;
mod config;
mod error;
mod lifecycle;
mod posting;
mod stock;

pub use config::{LedgerConfig, UNKNOWN_INSTANCE};
pub use error::{ErrorCode, ErrorPayload, LedgerError, LedgerResult};

use sqlx::SqlitePool;
use tracing::instrument;

use tally_core::request::TransactionFilter;
use tally_core::{Transaction, TransactionDetail};

use crate::repository::{client, payment, transaction};

/// Runs ledger operations against one pool.
///
/// Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(pool: SqlitePool, config: LedgerConfig) -> Self {
        Ledger { pool, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// A transaction with its client, items (with SKU and name) and
    /// payments, read from one snapshot.
    #[instrument(level = "debug", skip_all, fields(instance_id = %self.config.instance_id, transaction_id = %id))]
    pub async fn get_transaction(&self, id: &str) -> LedgerResult<TransactionDetail> {
        let mut tx = self.pool.begin().await?;

        let header = transaction::find(&mut *tx, id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", id))?;

        let client = match &header.client_id {
            Some(client_id) => client::find(&mut *tx, client_id).await?,
            None => None,
        };
        let items = transaction::item_details(&mut *tx, id).await?;
        let payments = payment::for_transaction(&mut *tx, id).await?;

        tx.commit().await?;

        Ok(TransactionDetail {
            transaction: header,
            client,
            items,
            payments,
        })
    }

    /// Transactions matching `filter`, newest first.
    #[instrument(level = "debug", skip_all, fields(instance_id = %self.config.instance_id))]
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>> {
        Ok(transaction::list(&self.pool, filter).await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{NaiveDate, Utc};

    use tally_core::request::{NewCategory, NewClient, NewProduct};
    use tally_core::{Category, Client, Money, Product};

    use super::{Ledger, LedgerConfig};
    use crate::pool::{Database, DbConfig};

    /// Fresh in-memory database and a ledger over it.
    pub async fn ledger() -> (Database, Ledger) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let ledger = db.ledger(LedgerConfig::new("test"));
        (db, ledger)
    }

    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub async fn seed_category(ledger: &Ledger) -> Category {
        ledger
            .create_category(&NewCategory {
                name: "Groceries".to_string(),
                description: None,
            })
            .await
            .unwrap()
    }

    /// Product with a minimum stock level of 5.
    pub async fn seed_product(
        ledger: &Ledger,
        category_id: &str,
        sku: &str,
        price_cents: i64,
        cost_cents: i64,
        stock: i64,
    ) -> Product {
        ledger
            .create_product(&NewProduct {
                category_id: category_id.to_string(),
                name: format!("Product {sku}"),
                sku: sku.to_string(),
                price: Money::from_cents(price_cents),
                cost: Money::from_cents(cost_cents),
                stock_quantity: stock,
                min_stock_level: 5,
            })
            .await
            .unwrap()
    }

    pub async fn seed_client(ledger: &Ledger, name: &str, balance_cents: i64) -> Client {
        ledger
            .create_client(&NewClient {
                current_balance: Money::from_cents(balance_cents),
                ..NewClient::named(name)
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ledger, seed_category, seed_client, seed_product, today};
    use super::*;
    use chrono::Days;
    use tally_core::request::{LineItem, NewPayment, TransactionRequest};
    use tally_core::{Money, TransactionStatus, TransactionType};

    #[tokio::test]
    async fn test_get_transaction_detail() {
        let (_db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 10).await;
        let oil = seed_product(&ledger, &category.id, "OIL-1L", 500, 300, 10).await;
        let client = seed_client(&ledger, "Ahmed Traders", 0).await;

        let request = TransactionRequest::new(
            TransactionType::Sale,
            today(),
            vec![
                LineItem::new(&oil.id, 1, Money::from_cents(500)),
                LineItem::new(&rice.id, 2, Money::from_cents(1000)),
            ],
        )
        .with_client(&client.id);
        let posted = ledger.post_transaction(&request).await.unwrap();

        ledger
            .record_payment(
                &posted.transaction.id,
                &NewPayment {
                    amount: Money::from_cents(1000),
                    method: "cash".to_string(),
                    reference_number: None,
                    date: today(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let detail = ledger.get_transaction(&posted.transaction.id).await.unwrap();
        assert_eq!(detail.transaction.id, posted.transaction.id);
        assert_eq!(detail.transaction.total_cents, posted.transaction.total_cents);
        assert_eq!(detail.client.as_ref().map(|c| c.id.as_str()), Some(client.id.as_str()));
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].product_sku, "OIL-1L");
        assert_eq!(detail.items[1].product_sku, "RICE-5KG");
        assert_eq!(detail.items[1].line_no, 2);
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.total_paid().cents(), 1000);

        // Reads don't change anything.
        let again = ledger.get_transaction(&posted.transaction.id).await.unwrap();
        assert_eq!(again, detail);
    }

    #[tokio::test]
    async fn test_get_unknown_transaction() {
        let (_db, ledger) = ledger().await;
        let err = ledger.get_transaction("missing").await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "Transaction"));
    }

    #[tokio::test]
    async fn test_list_transactions_filters_and_orders() {
        let (_db, ledger) = ledger().await;
        let category = seed_category(&ledger).await;
        let rice = seed_product(&ledger, &category.id, "RICE-5KG", 1000, 700, 100).await;
        let client = seed_client(&ledger, "Ahmed Traders", 0).await;

        let yesterday = today().checked_sub_days(Days::new(1)).unwrap();
        let line = || vec![LineItem::new(&rice.id, 1, Money::from_cents(1000))];

        let old_sale = ledger
            .post_transaction(&TransactionRequest::new(TransactionType::Sale, yesterday, line()))
            .await
            .unwrap();
        let new_sale = ledger
            .post_transaction(
                &TransactionRequest::new(TransactionType::Sale, today(), line())
                    .with_client(&client.id)
                    .with_status(TransactionStatus::Pending),
            )
            .await
            .unwrap();
        ledger
            .post_transaction(&TransactionRequest::new(TransactionType::Purchase, today(), line()))
            .await
            .unwrap();

        let sales = ledger
            .list_transactions(&TransactionFilter {
                kind: Some(TransactionType::Sale),
                ..TransactionFilter::default()
            })
            .await
            .unwrap();
        let ids: Vec<&str> = sales.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![new_sale.transaction.id.as_str(), old_sale.transaction.id.as_str()]);

        let for_client = ledger
            .list_transactions(&TransactionFilter {
                client_id: Some(client.id.clone()),
                ..TransactionFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(for_client.len(), 1);

        let pending = ledger
            .list_transactions(&TransactionFilter {
                status: Some(TransactionStatus::Pending),
                ..TransactionFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, new_sale.transaction.id);

        let all = ledger.list_transactions(&TransactionFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
