//! # Stock Movement Repository
//!
//! The append-only stock ledger. Rows are only ever inserted, under the
//! database write lock, so `rowid` is commit order and every `balance_after`
//! continues the row before it. History is read in `rowid` order; `created_at`
//! only selects a point in time.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::StockMovement;

const COLUMNS: &str = "id, product_id, direction, quantity, delta, balance_after, reason, \
                       reference_type, reference_id, created_at";

pub async fn insert<'e, E>(executor: E, movement: &StockMovement) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(
        product_id = %movement.product_id,
        direction = %movement.direction,
        delta = movement.delta,
        balance_after = movement.balance_after,
        "Recording stock movement"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, direction, quantity, delta, balance_after,
            reason, reference_type, reference_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.direction)
    .bind(movement.quantity)
    .bind(movement.delta)
    .bind(movement.balance_after)
    .bind(&movement.reason)
    .bind(&movement.reference_type)
    .bind(&movement.reference_id)
    .bind(movement.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// All movements of a product, oldest first.
pub async fn history<'e, E>(executor: E, product_id: &str) -> DbResult<Vec<StockMovement>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM stock_movements WHERE product_id = ?1 ORDER BY rowid"
    );
    let movements = sqlx::query_as::<_, StockMovement>(&sql)
        .bind(product_id)
        .fetch_all(executor)
        .await?;

    Ok(movements)
}

/// Movements caused by one referenced record, in insertion order.
pub async fn for_reference<'e, E>(
    executor: E,
    reference_type: &str,
    reference_id: &str,
) -> DbResult<Vec<StockMovement>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM stock_movements \
         WHERE reference_type = ?1 AND reference_id = ?2 ORDER BY rowid"
    );
    let movements = sqlx::query_as::<_, StockMovement>(&sql)
        .bind(reference_type)
        .bind(reference_id)
        .fetch_all(executor)
        .await?;

    Ok(movements)
}

/// Stock level right after the last movement at or before `at`; 0 when the
/// product had no movements yet.
pub async fn balance_at<'e, E>(executor: E, product_id: &str, at: DateTime<Utc>) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT balance_after FROM stock_movements
        WHERE product_id = ?1 AND created_at <= ?2
        ORDER BY rowid DESC
        LIMIT 1
        "#,
    )
    .bind(product_id)
    .bind(at)
    .fetch_optional(executor)
    .await?;

    Ok(balance.unwrap_or(0))
}

/// Σ delta over a product's movements.
pub async fn sum_deltas<'e, E>(executor: E, product_id: &str) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sum: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(delta), 0) FROM stock_movements WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_one(executor)
    .await?;

    Ok(sum)
}

/// Pool-backed movement reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    pub async fn history(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        history(&self.pool, product_id).await
    }

    pub async fn for_reference(
        &self,
        reference_type: &str,
        reference_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        for_reference(&self.pool, reference_type, reference_id).await
    }

    pub async fn balance_at(&self, product_id: &str, at: DateTime<Utc>) -> DbResult<i64> {
        balance_at(&self.pool, product_id, at).await
    }

    pub async fn sum_deltas(&self, product_id: &str) -> DbResult<i64> {
        sum_deltas(&self.pool, product_id).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
