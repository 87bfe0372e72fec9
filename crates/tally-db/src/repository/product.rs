//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two statements touch stock_quantity, both single-row UPDATEs:          │
//! │                                                                         │
//! │  lock()        SET stock_quantity = stock_quantity  RETURNING *         │
//! │                └── takes SQLite's write lock before anything is read    │
//! │                                                                         │
//! │  apply_delta() SET stock_quantity = stock_quantity + ?                  │
//! │                RETURNING stock_quantity                                 │
//! │                └── no read-then-write race: the add happens in SQL      │
//! │                                                                         │
//! │  Both are only called by the ledger, inside a transaction that also     │
//! │  writes the matching stock movement.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{Money, Product};

const COLUMNS: &str = "id, category_id, name, sku, price_cents, cost_cents, \
                       stock_quantity, min_stock_level, created_at, updated_at";

// =============================================================================
// Executor Functions
// =============================================================================

/// Gets a product by ID.
pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}

/// Gets a product by SKU.
pub async fn find_by_sku<'e, E>(executor: E, sku: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {COLUMNS} FROM products WHERE sku = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(sku)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}

/// Lists all products by name.
pub async fn list<'e, E>(executor: E) -> DbResult<Vec<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {COLUMNS} FROM products ORDER BY name, sku");
    let products = sqlx::query_as::<_, Product>(&sql).fetch_all(executor).await?;

    Ok(products)
}

/// Products at or below their minimum stock level, emptiest first.
pub async fn list_low_stock<'e, E>(executor: E) -> DbResult<Vec<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {COLUMNS} FROM products \
         WHERE stock_quantity <= min_stock_level \
         ORDER BY stock_quantity, name"
    );
    let products = sqlx::query_as::<_, Product>(&sql).fetch_all(executor).await?;

    Ok(products)
}

/// Σ stock × cost over all products. Negative stock counts as zero.
pub async fn stock_value<'e, E>(executor: E) -> DbResult<Money>
where
    E: Executor<'e, Database = Sqlite>,
{
    let cents: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(CASE WHEN stock_quantity > 0 \
                                  THEN stock_quantity * cost_cents ELSE 0 END), 0) \
         FROM products",
    )
    .fetch_one(executor)
    .await?;

    Ok(Money::from_cents(cents))
}

/// Inserts a product row as given.
///
/// ## Errors
/// * `DbError::UniqueViolation` - SKU already exists
/// * `DbError::ForeignKeyViolation` - category doesn't exist
pub async fn insert<'e, E>(executor: E, product: &Product) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(sku = %product.sku, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, category_id, name, sku, price_cents, cost_cents,
            stock_quantity, min_stock_level, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&product.id)
    .bind(&product.category_id)
    .bind(&product.name)
    .bind(&product.sku)
    .bind(product.price_cents)
    .bind(product.cost_cents)
    .bind(product.stock_quantity)
    .bind(product.min_stock_level)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(executor)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, product.sku.clone()),
        other => other,
    })?;

    Ok(())
}

/// Locks a product row for the rest of the transaction and returns it.
///
/// `Ok(None)` when the product doesn't exist.
pub async fn lock<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "UPDATE products SET stock_quantity = stock_quantity WHERE id = ?1 RETURNING {COLUMNS}"
    );
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}

/// Adds `delta` to a product's stock and returns the new level.
pub async fn apply_delta<'e, E>(
    executor: E,
    id: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, delta = %delta, "Updating stock");

    let stock: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING stock_quantity
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    stock.ok_or_else(|| DbError::not_found("Product", id))
}

// =============================================================================
// Repository
// =============================================================================

/// Pool-backed product reads.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().get_by_sku("RICE-5KG").await?;
/// let low = db.products().list_low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        find(&self.pool, id).await
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        find_by_sku(&self.pool, sku).await
    }

    pub async fn list(&self) -> DbResult<Vec<Product>> {
        list(&self.pool).await
    }

    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        list_low_stock(&self.pool).await
    }

    pub async fn stock_value(&self) -> DbResult<Money> {
        stock_value(&self.pool).await
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
