//! Storage shared by the two name-only tables, `roles` and `departments`.

use crate::error::AppError;
use serde::Deserialize;
use sqlx::{SqlitePool, sqlite::SqliteRow};
use tracing::debug;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct NameReq {
    #[schema(example = "Engineering")]
    pub name: String,
}

impl NameReq {
    pub fn validated(&self) -> Result<&str, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name must not be empty".into()));
        }
        Ok(name)
    }
}

pub async fn list<T>(
    pool: &SqlitePool,
    table: &'static str,
    per_page: u32,
    offset: i64,
) -> Result<(Vec<T>, i64), AppError>
where
    T: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
{
    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await?;

    debug!(table, per_page, offset, "Fetching reference rows");

    let rows = sqlx::query_as::<_, T>(&format!(
        "SELECT id, name FROM {} ORDER BY id LIMIT ? OFFSET ?",
        table
    ))
    .bind(per_page as i64)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((rows, total))
}

pub async fn fetch<T>(pool: &SqlitePool, table: &'static str, id: i64) -> Result<T, AppError>
where
    T: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
{
    sqlx::query_as::<_, T>(&format!("SELECT id, name FROM {} WHERE id = ?", table))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No such row in {}", table)))
}

pub async fn insert(pool: &SqlitePool, table: &'static str, name: &str) -> Result<i64, AppError> {
    let id = sqlx::query(&format!("INSERT INTO {} (name) VALUES (?)", table))
        .bind(name)
        .execute(pool)
        .await?
        .last_insert_rowid();
    Ok(id)
}

pub async fn rename(
    pool: &SqlitePool,
    table: &'static str,
    id: i64,
    name: &str,
) -> Result<(), AppError> {
    let result = sqlx::query(&format!("UPDATE {} SET name = ? WHERE id = ?", table))
        .bind(name)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("No such row in {}", table)));
    }
    Ok(())
}

pub async fn delete(pool: &SqlitePool, table: &'static str, id: i64) -> Result<(), AppError> {
    let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("No such row in {}", table)));
    }
    Ok(())
}
