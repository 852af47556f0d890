use crate::{
    db::traits::InsertTransactionResult,
    db_types::{NewTransaction, Transaction, TransactionUpdate},
};

/// Storage for fulfillment transactions.
///
/// Only the pipeline's own bookkeeping lives here. Transactions are created by the purchase flow and are never
/// deleted.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase: Clone {
    type Error: std::error::Error;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new transaction. Inserting a reference that already exists changes nothing and returns the id of the
    /// existing row.
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<InsertTransactionResult, Self::Error>;

    async fn fetch_transaction(&self, id: i64) -> Result<Option<Transaction>, Self::Error>;

    async fn fetch_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>, Self::Error>;

    /// Transactions that still need to be submitted: status `queued` or `processing`, no provider order id or
    /// reference, and fewer than `max_retries` attempts. Oldest first, at most `limit` rows.
    async fn fetch_submission_candidates(&self, limit: i64, max_retries: i64) -> Result<Vec<Transaction>, Self::Error>;

    /// Transactions the provider has accepted but not finished: status `queued` or `processing` with a provider order
    /// id or reference. Least recently updated first, at most `limit` rows.
    async fn fetch_reconciliation_candidates(&self, limit: i64) -> Result<Vec<Transaction>, Self::Error>;

    /// Applies `update` to a single transaction and returns the new state. Metadata is merged, not replaced, and the
    /// read-merge-write happens atomically.
    async fn update_transaction(&self, id: i64, update: TransactionUpdate) -> Result<Transaction, Self::Error>;

    /// Closes the database connection pool.
    async fn close(&mut self) -> Result<(), Self::Error>;
}
