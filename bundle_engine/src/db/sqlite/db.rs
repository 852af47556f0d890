use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::{activity, db_url, new_pool, transactions, SqliteDatabaseError};
use crate::{
    db::traits::{ActivityStore, FulfillmentDatabase, InsertTransactionResult},
    db_types::{ActivityLog, NewTransaction, Notification, Transaction, TransactionUpdate},
    events::{ActivityLogEvent, NotificationEvent},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `BUNDLE_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertTransactionResult, Self::Error> {
        let mut db_tx = self.pool.begin().await?;
        let reference = tx.reference.clone();
        let result = transactions::idempotent_insert(tx, &mut db_tx).await?;
        db_tx.commit().await?;
        match result {
            InsertTransactionResult::Inserted(id) => debug!("🗃️ Transaction {reference} saved with id {id}"),
            InsertTransactionResult::AlreadyExists(id) => {
                debug!("🗃️ Transaction {reference} already exists with id {id}. Nothing inserted")
            },
        }
        Ok(result)
    }

    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transaction(id, &mut conn).await
    }

    async fn fetch_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transaction_by_reference(reference, &mut conn).await
    }

    async fn fetch_submission_candidates(&self, limit: i64, max_retries: i64) -> Result<Vec<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_submission_candidates(limit, max_retries, &mut conn).await
    }

    async fn fetch_reconciliation_candidates(&self, limit: i64) -> Result<Vec<Transaction>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_reconciliation_candidates(limit, &mut conn).await
    }

    async fn update_transaction(&self, id: i64, update: TransactionUpdate) -> Result<Transaction, Self::Error> {
        let mut db_tx = self.pool.begin().await?;
        let updated = transactions::update_transaction(id, update, &mut db_tx).await?;
        db_tx.commit().await?;
        trace!("🗃️ Transaction #{id} is now {} with {} retries", updated.status, updated.retries);
        Ok(updated)
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}

impl ActivityStore for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn save_notification(&self, notification: &NotificationEvent) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::insert_notification(notification, &mut conn).await
    }

    async fn save_activity_log(&self, entry: &ActivityLogEvent) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::insert_activity_log(entry, &mut conn).await
    }

    async fn fetch_notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::fetch_notifications_for_user(user_id, &mut conn).await
    }

    async fn fetch_activity_logs(&self, limit: i64) -> Result<Vec<ActivityLog>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::fetch_activity_logs(limit, &mut conn).await
    }
}
