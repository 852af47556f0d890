use log::*;

use crate::SqliteDatabase;

pub const IN_MEMORY_DB: &str = "sqlite::memory:";

/// Loads `.env.test`, starts logging, and returns a migrated in-memory database.
pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let db = SqliteDatabase::new_with_url(IN_MEMORY_DB, 1).await.expect("Error creating in-memory database");
    db.run_migrations().await.expect("Error running DB migrations");
    debug!("🗃️ In-memory test database ready");
    db
}
