#![allow(dead_code)]

use actix_web::test::TestRequest;
use lms::{
    auth::{jwt::generate_access_token, registration::add_role_to_user},
    config::Config,
    db::init_memory_db,
    model::role::RoleName,
    seed::build_sample_db,
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::net::SocketAddr;

pub const SECRET: &str = "integration-secret";

pub fn config() -> Config {
    Config {
        database_file: ":memory:".into(),
        jwt_secret: SECRET.into(),
        server_addr: "127.0.0.1:0".into(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 10_000,
        rate_register_per_min: 10_000,
        rate_refresh_per_min: 10_000,
        rate_protected_per_min: 10_000,
        admin_prefix: "/admin".into(),
        seed_default_days: 20,
        log_dir: "logs".into(),
        log_level: tracing::Level::DEBUG,
    }
}

/// Fresh private store holding the sample data.
pub async fn seeded_pool() -> SqlitePool {
    let pool = init_memory_db().await.expect("in-memory store");
    build_sample_db(&pool, 20).await.expect("sample data");
    pool
}

/// App with every route mounted, as `main` builds it minus docs and logging.
#[macro_export]
macro_rules! test_app {
    ($pool:expr, $config:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool.clone()))
                .app_data(actix_web::web::Data::new($config.clone()))
                .configure(|cfg| lms::routes::configure(cfg, $config.clone())),
        )
        .await
    };
}

fn peer() -> SocketAddr {
    // the rate limiter keys on the peer address
    "127.0.0.1:40000".parse().unwrap()
}

fn with_token(req: TestRequest, token: Option<&str>) -> TestRequest {
    let req = req.peer_addr(peer());
    match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {}", t))),
        None => req,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> TestRequest {
    with_token(TestRequest::get().uri(uri), token)
}

pub fn post(uri: &str, token: Option<&str>, body: &Value) -> TestRequest {
    with_token(TestRequest::post().uri(uri).set_json(body), token)
}

pub fn put(uri: &str, token: Option<&str>, body: &Value) -> TestRequest {
    with_token(TestRequest::put().uri(uri).set_json(body), token)
}

pub fn delete(uri: &str, token: Option<&str>) -> TestRequest {
    with_token(TestRequest::delete().uri(uri), token)
}

pub async fn user_id(pool: &SqlitePool, email: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("user exists")
}

/// Access token for an existing account, without going through login.
pub async fn token_for(pool: &SqlitePool, email: &str) -> String {
    let id = user_id(pool, email).await;
    generate_access_token(id, email.to_string(), SECRET, 900).expect("token")
}

pub async fn add_department(pool: &SqlitePool, name: &str) -> i64 {
    sqlx::query("INSERT INTO departments (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await
        .expect("department insert")
        .last_insert_rowid()
}

/// Inserts an account directly; its password is never checked by these tests.
pub async fn add_user(
    pool: &SqlitePool,
    email: &str,
    department_id: Option<i64>,
    days: Option<i64>,
    role: RoleName,
) -> i64 {
    let id = sqlx::query(
        "INSERT INTO users (email, password, active, days, department_id) VALUES (?, 'x', 1, ?, ?)",
    )
    .bind(email)
    .bind(days)
    .bind(department_id)
    .execute(pool)
    .await
    .expect("user insert")
    .last_insert_rowid();

    let mut conn = pool.acquire().await.expect("connection");
    add_role_to_user(&mut *conn, id, role).await.expect("role grant");
    id
}

pub fn leave(reason: &str, start: &str, end: &str) -> Value {
    serde_json::json!({ "reason": reason, "start_date": start, "end_date": end })
}
