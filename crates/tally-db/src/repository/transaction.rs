//! # Transaction Repository
//!
//! Transaction headers and their items.
//!
//! ## What May Change
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  transactions                                                           │
//! │  ├── status, payment_status, notes, updated_at   ← update_fields()      │
//! │  └── everything else                             ← frozen at insert     │
//! │                                                    (trigger-enforced)   │
//! │                                                                         │
//! │  transaction_items                               ← insert only          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::request::{TransactionFilter, TransactionUpdate};
use tally_core::{Transaction, TransactionItem, TransactionItemDetail, TransactionStatus};

const COLUMNS: &str = "id, client_id, kind, status, payment_status, date, notes, \
                       subtotal_cents, discount_type, discount_value, discount_cents, \
                       vat_enabled, vat_rate_bps, vat_cents, total_cents, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, transaction_id, product_id, line_no, quantity, \
                            unit_price_cents, line_total_cents, created_at";

// =============================================================================
// Headers
// =============================================================================

pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {COLUMNS} FROM transactions WHERE id = ?1");
    let transaction = sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(transaction)
}

/// Lists transactions matching `filter`, newest date first, then newest
/// created first.
pub async fn list<'e, E>(executor: E, filter: &TransactionFilter) -> DbResult<Vec<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM transactions WHERE 1 = 1"));

    if let Some(kind) = filter.kind {
        query.push(" AND kind = ").push_bind(kind);
    }
    if let Some(client_id) = &filter.client_id {
        query.push(" AND client_id = ").push_bind(client_id.clone());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    query.push(" ORDER BY date DESC, created_at DESC, rowid DESC");

    let transactions = query
        .build_query_as::<Transaction>()
        .fetch_all(executor)
        .await?;

    Ok(transactions)
}

pub async fn insert<'e, E>(executor: E, transaction: &Transaction) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %transaction.id, kind = %transaction.kind, "Inserting transaction");

    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, client_id, kind, status, payment_status, date, notes,
            subtotal_cents, discount_type, discount_value, discount_cents,
            vat_enabled, vat_rate_bps, vat_cents, total_cents,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7,
            ?8, ?9, ?10, ?11,
            ?12, ?13, ?14, ?15,
            ?16, ?17
        )
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.client_id)
    .bind(transaction.kind)
    .bind(transaction.status)
    .bind(transaction.payment_status)
    .bind(transaction.date)
    .bind(&transaction.notes)
    .bind(transaction.subtotal_cents)
    .bind(transaction.discount_type)
    .bind(transaction.discount_value)
    .bind(transaction.discount_cents)
    .bind(transaction.vat_enabled)
    .bind(transaction.vat_rate_bps)
    .bind(transaction.vat_cents)
    .bind(transaction.total_cents)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Locks a transaction row for the rest of the transaction and returns it.
pub async fn lock<'e, E>(executor: E, id: &str) -> DbResult<Option<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("UPDATE transactions SET status = status WHERE id = ?1 RETURNING {COLUMNS}");
    let transaction = sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(transaction)
}

/// Applies the mutable fields of `update`; `None` fields stay as they are.
pub async fn update_fields<'e, E>(
    executor: E,
    id: &str,
    update: &TransactionUpdate,
    now: DateTime<Utc>,
) -> DbResult<Option<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, "Updating transaction");

    let sql = format!(
        "UPDATE transactions SET \
             status = COALESCE(?2, status), \
             payment_status = COALESCE(?3, payment_status), \
             notes = COALESCE(?4, notes), \
             updated_at = ?5 \
         WHERE id = ?1 RETURNING {COLUMNS}"
    );
    let transaction = sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .bind(update.status)
        .bind(update.payment_status)
        .bind(&update.notes)
        .bind(now)
        .fetch_optional(executor)
        .await?;

    Ok(transaction)
}

pub async fn set_status<'e, E>(
    executor: E,
    id: &str,
    status: TransactionStatus,
    now: DateTime<Utc>,
) -> DbResult<Option<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, status = %status, "Setting transaction status");

    let sql = format!(
        "UPDATE transactions SET status = ?2, updated_at = ?3 WHERE id = ?1 RETURNING {COLUMNS}"
    );
    let transaction = sqlx::query_as::<_, Transaction>(&sql)
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_optional(executor)
        .await?;

    Ok(transaction)
}

// =============================================================================
// Items
// =============================================================================

pub async fn insert_item<'e, E>(executor: E, item: &TransactionItem) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        transaction_id = %item.transaction_id,
        product_id = %item.product_id,
        line_no = item.line_no,
        "Inserting transaction item"
    );

    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, product_id, line_no, quantity,
            unit_price_cents, line_total_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.transaction_id)
    .bind(&item.product_id)
    .bind(item.line_no)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.line_total_cents)
    .bind(item.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Items of a transaction in line order.
pub async fn items<'e, E>(executor: E, transaction_id: &str) -> DbResult<Vec<TransactionItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM transaction_items WHERE transaction_id = ?1 ORDER BY line_no"
    );
    let items = sqlx::query_as::<_, TransactionItem>(&sql)
        .bind(transaction_id)
        .fetch_all(executor)
        .await?;

    Ok(items)
}

/// Items joined with their product's SKU and name, in line order.
pub async fn item_details<'e, E>(
    executor: E,
    transaction_id: &str,
) -> DbResult<Vec<TransactionItemDetail>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let items = sqlx::query_as::<_, TransactionItemDetail>(
        r#"
        SELECT
            i.id,
            i.product_id,
            p.sku AS product_sku,
            p.name AS product_name,
            i.line_no,
            i.quantity,
            i.unit_price_cents,
            i.line_total_cents
        FROM transaction_items i
        INNER JOIN products p ON p.id = i.product_id
        WHERE i.transaction_id = ?1
        ORDER BY i.line_no
        "#,
    )
    .bind(transaction_id)
    .fetch_all(executor)
    .await?;

    Ok(items)
}

// =============================================================================
// Repository
// =============================================================================

/// Pool-backed transaction reads.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        find(&self.pool, id).await
    }

    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        list(&self.pool, filter).await
    }

    pub async fn get_items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        items(&self.pool, transaction_id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
