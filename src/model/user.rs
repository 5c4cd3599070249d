use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A row of the `users` table, password hash included. Never serialized
/// to clients directly; the user resource maps it to `UserResponse`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub days: Option<i64>,
    pub password: String,
    pub active: bool,
    pub confirmed_at: Option<NaiveDateTime>,
    pub department_id: Option<i64>,
}

/// What a login needs to know about an account.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credentials {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub active: bool,
}
