use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
        registration::{NewAccount, register_account},
    },
    config::Config,
    error::AppError,
    model::user::Credentials,
    models::{LoginQuery, LoginReqDto, RegisterReq, TokenType},
    utils::email_registry,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

async fn store_refresh_token(
    pool: &SqlitePool,
    user_id: i64,
    jti: &str,
    exp: usize,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(jti)
    .bind(exp as i64)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Access + refresh pair; the refresh token is persisted so it can be revoked.
async fn issue_token_pair(
    pool: &SqlitePool,
    config: &Config,
    user_id: i64,
    email: &str,
) -> Result<(String, String), AppError> {
    let access_token = generate_access_token(
        user_id,
        email.to_string(),
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user_id,
        email.to_string(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool, user_id, &refresh_claims.jti, refresh_claims.exp).await?;

    Ok((access_token, refresh_token))
}

/// Self-service registration; the account starts with the `employee` role.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = Object, example = json!({
            "message": "User registered successfully",
            "user_id": 4
        })),
        (status = 400, description = "Missing email or password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(payload, pool), fields(email = %payload.email))]
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, AppError> {
    let email = payload.email.trim();

    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password must not be empty".into(),
        ));
    }

    if !email_registry::is_email_available(email, pool.get_ref()).await? {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let user_id = register_account(
        pool.get_ref(),
        NewAccount {
            email,
            password: &payload.password,
            first_name: payload.first_name.as_deref(),
            last_name: payload.last_name.as_deref(),
        },
    )
    .await?;

    info!(user_id, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user_id": user_id
    })))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Page the user was sent away from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Landing point of the "login required" redirect.
#[utoipa::path(
    get,
    path = "/auth/login",
    params(LoginQuery),
    responses(
        (status = 200, description = "Login instructions", body = Object, example = json!({
            "message": "Login required",
            "login": "POST /auth/login",
            "next": "/admin/request"
        }))
    ),
    tag = "Auth"
)]
pub async fn login_page(query: web::Query<LoginQuery>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Login required",
        "login": "POST /auth/login",
        "next": query.next,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    params(LoginQuery),
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials or disabled account")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user, query),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    query: web::Query<LoginQuery>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(AppError::Validation("Email or password required".into()));
    }

    let db_user = sqlx::query_as::<_, Credentials>(
        r#"
        SELECT id, email, password, active
        FROM users
        WHERE lower(email) = lower(?)
        "#,
    )
    .bind(user.email.trim())
    .fetch_optional(pool.get_ref())
    .await?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Ok(HttpResponse::Unauthorized().json(json!({ "error": "Invalid credentials" })));
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Ok(HttpResponse::Unauthorized().json(json!({ "error": "Invalid credentials" })));
    }

    if !db_user.active {
        info!(user_id = db_user.id, "Login refused: account disabled");
        return Ok(HttpResponse::Unauthorized().json(json!({ "error": "Account is disabled" })));
    }

    let (access_token, refresh_token) =
        issue_token_pair(pool.get_ref(), &config, db_user.id, &db_user.email).await?;

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        next: query.into_inner().next,
    }))
}

#[derive(sqlx::FromRow)]
struct RefreshRecord {
    id: i64,
    user_id: i64,
    revoked: bool,
}

/// Rotates a refresh token: the presented one is revoked, a new pair is issued.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let Some(token) = bearer(&req) else {
        return Ok(HttpResponse::Unauthorized().finish());
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    let record = sqlx::query_as::<_, RefreshRecord>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let record = match record {
        Some(r) if !r.revoked => r,
        _ => return Ok(HttpResponse::Unauthorized().finish()),
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(record.id)
        .execute(pool.get_ref())
        .await?;

    let (access_token, refresh_token) =
        issue_token_pair(pool.get_ref(), &config, record.user_id, &claims.sub).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        next: None,
    }))
}

/// Revokes the presented refresh token. Always answers 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> impl Responder {
    let claims = match bearer(&req).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
