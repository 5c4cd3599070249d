use crate::{
    auth::password::hash_password, error::AppError, model::role::RoleName, utils::email_registry,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// Emitted once per self-registration, inside the account's transaction.
#[derive(Debug)]
pub struct Registered {
    pub user_id: i64,
    pub email: String,
}

/// Grants `role` to `user_id` on the given connection.
pub async fn add_role_to_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    role: RoleName,
) -> Result<(), AppError> {
    let role_id = sqlx::query_scalar::<_, i64>("SELECT id FROM roles WHERE name = ?")
        .bind(role.as_ref())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Role `{}` is not seeded", role)))?;

    sqlx::query("INSERT OR IGNORE INTO roles_users (user_id, role_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Registration hook: every self-registered account starts as an employee.
pub async fn on_registered(conn: &mut SqliteConnection, event: &Registered) -> Result<(), AppError> {
    add_role_to_user(conn, event.user_id, RoleName::Employee).await?;
    info!(user_id = event.user_id, email = %event.email, "Granted default role");
    Ok(())
}

/// Creates an active account and runs the registration hook before committing.
///
/// Either both the account and its default role exist afterwards, or neither does.
pub async fn register_account(pool: &SqlitePool, account: NewAccount<'_>) -> Result<i64, AppError> {
    let hashed = hash_password(account.password)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let mut tx = pool.begin().await?;

    let user_id = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, email, password, active)
        VALUES (?, ?, ?, ?, 1)
        "#,
    )
    .bind(account.first_name)
    .bind(account.last_name)
    .bind(account.email)
    .bind(&hashed)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let event = Registered {
        user_id,
        email: account.email.to_string(),
    };
    on_registered(&mut tx, &event).await?;

    tx.commit().await?;

    email_registry::mark_taken(account.email).await;

    Ok(user_id)
}
