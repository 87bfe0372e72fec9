//! Payments recorded against transactions. Insert-only.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Money, Payment};

const COLUMNS: &str =
    "id, transaction_id, amount_cents, method, reference_number, date, notes, created_at";

pub async fn insert<'e, E>(executor: E, payment: &Payment) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        transaction_id = %payment.transaction_id,
        amount_cents = payment.amount_cents,
        "Recording payment"
    );

    sqlx::query(
        r#"
        INSERT INTO payments (
            id, transaction_id, amount_cents, method, reference_number, date, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.transaction_id)
    .bind(payment.amount_cents)
    .bind(&payment.method)
    .bind(&payment.reference_number)
    .bind(payment.date)
    .bind(&payment.notes)
    .bind(payment.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Payments of a transaction by date, then in recording order.
pub async fn for_transaction<'e, E>(executor: E, transaction_id: &str) -> DbResult<Vec<Payment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM payments WHERE transaction_id = ?1 ORDER BY date, created_at, rowid"
    );
    let payments = sqlx::query_as::<_, Payment>(&sql)
        .bind(transaction_id)
        .fetch_all(executor)
        .await?;

    Ok(payments)
}

#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    pub async fn get_payments(&self, transaction_id: &str) -> DbResult<Vec<Payment>> {
        for_transaction(&self.pool, transaction_id).await
    }

    /// Sum of all payments of a transaction.
    pub async fn get_total_paid(&self, transaction_id: &str) -> DbResult<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE transaction_id = ?1",
        )
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents))
    }
}
