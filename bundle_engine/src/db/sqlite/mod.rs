//! SQLite backend for the fulfillment engine.
//!
//! Queries are grouped by table in free functions that take a bare connection, so that [`SqliteDatabase`] can run
//! several of them inside one database transaction.
mod activity;
mod db;
mod errors;
mod transactions;

use std::{env, str::FromStr};

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

const SQLITE_DB_URL: &str = "sqlite://data/bundle_store.db";

pub fn db_url() -> String {
    let result = env::var("BUNDLE_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ BUNDLE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if url.contains(":memory:") {
        // An in-memory database lives exactly as long as its connection
        pool_options = pool_options.min_connections(1).idle_timeout(None).max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}
