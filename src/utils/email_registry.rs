//! Fast answers to "is this email already registered?".
//!
//! A cuckoo filter gives a cheap definite "no", a moka cache a cheap "yes",
//! and the store settles everything in between. Neither structure is
//! authoritative; the unique index on `users.email` is.

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::SqlitePool;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{info, warn};

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Only taken addresses are stored.
static TAKEN_CACHE: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400))
        .build()
});

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn might_exist(email: &String) -> bool {
    match EMAIL_FILTER.read() {
        Ok(filter) => filter.contains(email),
        // a poisoned filter can only cost us a store lookup
        Err(_) => true,
    }
}

fn insert_batch(emails: &[String]) {
    match EMAIL_FILTER.write() {
        Ok(mut filter) => {
            for email in emails {
                filter.add(email);
            }
        }
        Err(_) => warn!("Email filter lock poisoned, skipping insert"),
    }
}

/// Record a freshly stored address.
pub async fn mark_taken(email: &str) {
    let email = normalize(email);
    insert_batch(std::slice::from_ref(&email));
    TAKEN_CACHE.insert(email, ()).await;
}

/// Drop an address from the positive cache after its account is deleted.
///
/// The filter keeps it; that only means one extra store lookup later.
pub async fn forget(email: &str) {
    TAKEN_CACHE.invalidate(&normalize(email)).await;
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_email_available(email: &str, pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let email = normalize(email);

    if !might_exist(&email) {
        return Ok(true);
    }

    if TAKEN_CACHE.contains_key(&email) {
        return Ok(false);
    }

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = ? LIMIT 1)",
    )
    .bind(&email)
    .fetch_one(pool)
    .await?;

    if exists {
        TAKEN_CACHE.insert(email, ()).await;
    }

    Ok(!exists)
}

/// Load every stored address into the filter, streaming in batches.
pub async fn warmup(pool: &SqlitePool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_scalar::<_, String>("SELECT email FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let email = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        batch.push(normalize(&email));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    info!(total, "Email filter warmup complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marked_addresses_are_reported_taken_without_the_store() {
        // lazy pool: never connects unless queried
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();

        mark_taken("  Someone.Unique@Registry.Test ").await;
        assert!(!is_email_available("someone.unique@registry.test", &pool).await.unwrap());
    }

    #[actix_web::test]
    async fn unseen_addresses_are_available_without_the_store() {
        let pool = SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        assert!(is_email_available("never.seen@registry.test", &pool).await.unwrap());
    }
}
