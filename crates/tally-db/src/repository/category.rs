//! Category persistence.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::Category;

pub async fn find<'e, E>(executor: E, id: &str) -> DbResult<Option<Category>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let category = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(category)
}

/// Takes the write lock by touching the category row. `None` when it
/// doesn't exist.
pub async fn lock<'e, E>(executor: E, id: &str) -> DbResult<Option<Category>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = name WHERE id = ?1 \
         RETURNING id, name, description, created_at, updated_at",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(category)
}

pub async fn list<'e, E>(executor: E) -> DbResult<Vec<Category>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name, description, created_at, updated_at FROM categories ORDER BY name",
    )
    .fetch_all(executor)
    .await?;

    Ok(categories)
}

/// ## Errors
/// * `DbError::UniqueViolation` - a category with this name exists
pub async fn insert<'e, E>(executor: E, category: &Category) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(name = %category.name, "Inserting category");

    sqlx::query(
        "INSERT INTO categories (id, name, description, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&category.id)
    .bind(&category.name)
    .bind(&category.description)
    .bind(category.created_at)
    .bind(category.updated_at)
    .execute(executor)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::duplicate(field, category.name.clone()),
        other => other,
    })?;

    Ok(())
}

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        find(&self.pool, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Category>> {
        list(&self.pool).await
    }
}
