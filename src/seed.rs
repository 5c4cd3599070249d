use crate::{
    auth::{password::hash_password, registration::add_role_to_user},
    db::{create_schema, drop_schema},
    error::AppError,
    model::role::RoleName,
};
use sqlx::SqlitePool;
use tracing::info;

pub const SAMPLE_DEPARTMENT: &str = "General";

struct SampleUser {
    first_name: &'static str,
    email: &'static str,
    password: &'static str,
    role: RoleName,
    /// Superuser carries no allotment and no department.
    staff: bool,
}

const SAMPLE_USERS: [SampleUser; 3] = [
    SampleUser {
        first_name: "Admin",
        email: "admin",
        password: "admin",
        role: RoleName::Superuser,
        staff: false,
    },
    SampleUser {
        first_name: "Manager",
        email: "manager@test",
        password: "test",
        role: RoleName::Manager,
        staff: true,
    },
    SampleUser {
        first_name: "Employee",
        email: "employee@test",
        password: "test",
        role: RoleName::Employee,
        staff: true,
    },
];

/// Wipes the store and fills it with the three roles and three sample users.
///
/// Destructive and unguarded: callers decide whether a store already exists.
pub async fn build_sample_db(pool: &SqlitePool, default_days: i64) -> Result<(), AppError> {
    drop_schema(pool).await?;
    create_schema(pool).await?;

    let mut tx = pool.begin().await?;

    for role in [RoleName::Superuser, RoleName::Manager, RoleName::Employee] {
        sqlx::query("INSERT INTO roles (name) VALUES (?)")
            .bind(role.as_ref())
            .execute(&mut *tx)
            .await?;
    }

    let department_id = sqlx::query("INSERT INTO departments (name) VALUES (?)")
        .bind(SAMPLE_DEPARTMENT)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for sample in &SAMPLE_USERS {
        let hashed = hash_password(sample.password)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let (days, department) = if sample.staff {
            (Some(default_days), Some(department_id))
        } else {
            (None, None)
        };

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (first_name, email, password, active, days, department_id)
            VALUES (?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(sample.first_name)
        .bind(sample.email)
        .bind(&hashed)
        .bind(days)
        .bind(department)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        add_role_to_user(&mut tx, user_id, sample.role).await?;
    }

    tx.commit().await?;

    info!(users = SAMPLE_USERS.len(), "Sample database built");
    Ok(())
}
