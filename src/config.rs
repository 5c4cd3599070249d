use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite file holding the whole store.
    pub database_file: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub admin_prefix: String,

    /// Allotment given to the sample manager and employee.
    pub seed_default_days: i64,

    pub log_dir: String,
    pub log_level: tracing::Level,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(name, default)
        .parse()
        .with_context(|| format!("{} is not a valid value", name))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            database_file: var_or("DATABASE_FILE", "lms.sqlite"),
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080"),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", "900")?, // 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", "604800")?, // 7 days

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: parsed_or("RATE_REGISTER_PER_MIN", "30")?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", "1000")?,

            admin_prefix: var_or("ADMIN_PREFIX", "/admin"),
            seed_default_days: parsed_or("SEED_DEFAULT_DAYS", "20")?,

            log_dir: var_or("LOG_DIR", "logs"),
            log_level: parsed_or("LOG_LEVEL", "debug")?,
        })
    }
}
