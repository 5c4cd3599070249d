use crate::{
    api::PageQuery,
    auth::{
        identity::{Identity, load_days_left},
        password::hash_password,
    },
    error::AppError,
    model::user::User,
    policy::access::{Entity, authorize},
    utils::{
        db_utils::{as_object, build_update_sql, execute_update, page_window},
        email_registry,
    },
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use utoipa::ToSchema;

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, days, password, active, confirmed_at, department_id";

/// Columns a superuser may change through a partial update.
const EDITABLE_COLUMNS: [&str; 8] = [
    "first_name",
    "last_name",
    "email",
    "days",
    "active",
    "confirmed_at",
    "department_id",
    "password",
];

/// Type-checks a partial update before anything is written.
///
/// The columns are typed on read, so a value of the wrong shape would leave a
/// row that no longer decodes.
fn validate_fields(fields: &Map<String, Value>) -> Result<(), AppError> {
    for (key, value) in fields {
        let well_typed = match key.as_str() {
            "first_name" | "last_name" => value.is_null() || value.is_string(),
            "email" | "password" => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            "days" | "department_id" => value.is_null() || value.is_i64(),
            "active" => value.is_boolean(),
            "confirmed_at" => {
                value.is_null()
                    || value.as_str().is_some_and(|s| {
                        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
                    })
            }
            _ => return Err(AppError::Validation(format!("Unknown field `{}`", key))),
        };

        if !well_typed {
            return Err(AppError::Validation(format!("Invalid value for `{}`", key)));
        }
    }

    Ok(())
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 3)]
    pub id: i64,
    #[schema(example = "Employee", nullable = true)]
    pub first_name: Option<String>,
    #[schema(nullable = true)]
    pub last_name: Option<String>,
    #[schema(example = "employee@test")]
    pub email: String,
    #[schema(example = 20, nullable = true)]
    pub days: Option<i64>,
    /// Derived, read-only.
    #[schema(example = 15)]
    pub days_left: i64,
    #[schema(example = 1, nullable = true)]
    pub department_id: Option<i64>,
    #[schema(example = json!(["employee"]))]
    pub roles: Vec<String>,
    pub active: bool,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub confirmed_at: Option<NaiveDateTime>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "jane@company.com")]
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(example = 20)]
    pub days: Option<i64>,
    #[schema(example = 1)]
    pub department_id: Option<i64>,
    /// Role names, e.g. `["manager"]`.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

async fn role_names(pool: &SqlitePool, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT r.name
        FROM roles r
        JOIN roles_users ru ON ru.role_id = r.id
        WHERE ru.user_id = ?
        ORDER BY r.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

async fn to_response(pool: &SqlitePool, user: User) -> Result<UserResponse, AppError> {
    let days_left = load_days_left(pool, user.id, user.days).await?;
    let roles = role_names(pool, user.id).await?;

    Ok(UserResponse {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
        days: user.days,
        days_left,
        department_id: user.department_id,
        roles,
        active: user.active,
        confirmed_at: user.confirmed_at,
    })
}

async fn fetch_user(pool: &SqlitePool, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Replaces the role set of `user_id` with the named roles.
async fn replace_roles(
    conn: &mut SqliteConnection,
    user_id: i64,
    names: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM roles_users WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    for name in names {
        let role_id = sqlx::query_scalar::<_, i64>("SELECT id FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Unknown role `{}`", name)))?;

        sqlx::query("INSERT OR IGNORE INTO roles_users (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

#[utoipa::path(
    get,
    path = "/admin/user",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated user list with derived balance", body = UserListResponse),
        (status = 303, description = "Not logged in, redirected to login"),
        (status = 403, description = "Superuser only")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn list_users(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::User, &identity)?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await?;

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users ORDER BY id LIMIT ? OFFSET ?",
        USER_COLUMNS
    ))
    .bind(per_page as i64)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await?;

    debug!(count = users.len(), page, per_page, "Fetched users");

    let mut data = Vec::with_capacity(users.len());
    for user in users {
        data.push(to_response(pool.get_ref(), user).await?);
    }

    Ok(HttpResponse::Ok().json(UserListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/user/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn get_user(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::User, &identity)?;

    let user = fetch_user(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(to_response(pool.get_ref(), user).await?))
}

/// Admin-created accounts get exactly the roles given; the registration hook does not run.
#[utoipa::path(
    post,
    path = "/admin/user",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid payload or unknown role"),
        (status = 403, description = "Superuser only"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn create_user(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::User, &identity)?;

    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password must not be empty".into(),
        ));
    }

    if !email_registry::is_email_available(email, pool.get_ref()).await? {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hashed = hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let mut tx = pool.begin().await?;

    let user_id = sqlx::query(
        r#"
        INSERT INTO users (first_name, last_name, email, days, password, active, department_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(email)
    .bind(payload.days)
    .bind(&hashed)
    .bind(payload.active)
    .bind(payload.department_id)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    replace_roles(&mut tx, user_id, &payload.roles).await?;
    tx.commit().await?;

    email_registry::mark_taken(email).await;
    info!(user_id, created_by = identity.user_id, "User created");

    let user = fetch_user(pool.get_ref(), user_id).await?;
    Ok(HttpResponse::Created().json(to_response(pool.get_ref(), user).await?))
}

/// Partial update. `roles` replaces the whole role set; `password` is re-hashed.
#[utoipa::path(
    put,
    path = "/admin/user/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    request_body(
        content = Object,
        description = "Any subset of first_name, last_name, email, days, active, confirmed_at, department_id, password, roles",
        example = json!({ "days": 25, "department_id": 2, "roles": ["manager"] })
    ),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Unknown field or role"),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn update_user(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::User, &identity)?;

    let user_id = path.into_inner();
    let previous = fetch_user(pool.get_ref(), user_id).await?;

    let mut fields = as_object(&body)?.clone();

    let roles = match fields.remove("roles") {
        Some(value) => Some(
            serde_json::from_value::<Vec<String>>(value)
                .map_err(|_| AppError::Validation("`roles` must be a list of names".into()))?,
        ),
        None => None,
    };

    validate_fields(&fields)?;

    if let Some(email) = fields.get("email").and_then(Value::as_str) {
        let email = email.trim().to_string();
        // a change of letter case only is not a new address
        if email.to_lowercase() != previous.email.to_lowercase()
            && !email_registry::is_email_available(&email, pool.get_ref()).await?
        {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        fields.insert("email".into(), Value::String(email));
    }

    if let Some(plain) = fields.get("password").and_then(Value::as_str) {
        let hashed = hash_password(plain)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        fields.insert("password".into(), Value::String(hashed));
    }

    let mut tx = pool.begin().await?;

    if !fields.is_empty() {
        let update = build_update_sql("users", &fields, &EDITABLE_COLUMNS, "id", user_id)?;
        execute_update(&mut *tx, update).await?;
    }

    if let Some(roles) = &roles {
        replace_roles(&mut tx, user_id, roles).await?;
    }

    tx.commit().await?;

    let user = fetch_user(pool.get_ref(), user_id).await?;
    if user.email != previous.email {
        email_registry::forget(&previous.email).await;
        email_registry::mark_taken(&user.email).await;
    }

    info!(user_id, updated_by = identity.user_id, "User updated");
    Ok(HttpResponse::Ok().json(to_response(pool.get_ref(), user).await?))
}

/// Deleting a user also deletes their leave requests and role memberships.
#[utoipa::path(
    delete,
    path = "/admin/user/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User and their requests deleted"),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn delete_user(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::User, &identity)?;

    let user_id = path.into_inner();
    let user = fetch_user(pool.get_ref(), user_id).await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    email_registry::forget(&user.email).await;
    info!(user_id, deleted_by = identity.user_id, "User deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
