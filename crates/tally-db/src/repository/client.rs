//! # Client Repository
//!
//! Clients and their accrual balance. Balance writes are single-statement
//! deltas or explicit overrides, both issued by the ledger.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::Client;

const COLUMNS: &str = "id, name, email, phone, address, credit_limit_cents, \
                       current_balance_cents, created_at, updated_at";

pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Client>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {COLUMNS} FROM clients WHERE id = ?1");
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(client)
}

pub async fn list<'e, E>(executor: E) -> DbResult<Vec<Client>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {COLUMNS} FROM clients ORDER BY name");
    let clients = sqlx::query_as::<_, Client>(&sql).fetch_all(executor).await?;

    Ok(clients)
}

pub async fn insert<'e, E>(executor: E, client: &Client) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(name = %client.name, "Inserting client");

    sqlx::query(
        r#"
        INSERT INTO clients (
            id, name, email, phone, address,
            credit_limit_cents, current_balance_cents, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&client.id)
    .bind(&client.name)
    .bind(&client.email)
    .bind(&client.phone)
    .bind(&client.address)
    .bind(client.credit_limit_cents)
    .bind(client.current_balance_cents)
    .bind(client.created_at)
    .bind(client.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Locks a client row for the rest of the transaction and returns it.
pub async fn lock<'e, E>(executor: E, id: &str) -> DbResult<Option<Client>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "UPDATE clients SET current_balance_cents = current_balance_cents \
         WHERE id = ?1 RETURNING {COLUMNS}"
    );
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(client)
}

/// Adds `delta` cents to the client's balance and returns the new balance.
pub async fn apply_balance_delta<'e, E>(
    executor: E,
    id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, delta = %delta, "Updating client balance");

    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE clients
        SET current_balance_cents = current_balance_cents + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING current_balance_cents
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    balance.ok_or_else(|| DbError::not_found("Client", id))
}

/// Overwrites the client's balance. `Ok(None)` when the client doesn't exist.
pub async fn set_balance<'e, E>(
    executor: E,
    id: &str,
    balance: i64,
    now: DateTime<Utc>,
) -> DbResult<Option<Client>>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, balance = %balance, "Setting client balance");

    let sql = format!(
        "UPDATE clients SET current_balance_cents = ?2, updated_at = ?3 \
         WHERE id = ?1 RETURNING {COLUMNS}"
    );
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(id)
        .bind(balance)
        .bind(now)
        .fetch_optional(executor)
        .await?;

    Ok(client)
}

/// Pool-backed client reads.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        find(&self.pool, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Client>> {
        list(&self.pool).await
    }
}
