//! Bundle Fulfillment Engine
//!
//! This library takes data bundle purchases that have already been paid for and recorded, and sees them through to
//! delivery by a third-party provider.
//!
//! The library is divided into three sections:
//! 1. Persistence. Backends implement [`FulfillmentDatabase`] and [`ActivityStore`]. SQLite is the only
//!    backend at present. The data types stored by the backends live in [`db_types`].
//! 2. The fulfillment pipeline ([`FulfillmentApi`]): the queue processor, which submits orders to the provider with
//!    bounded retries, and the reconciliation sweeper, which polls the provider until each order is settled.
//! 3. Events ([`mod@events`]). Customer notifications and activity-log entries are published as events, and the host
//!    application decides what to do with them.
mod db;

pub mod db_types;
pub mod events;
mod fulfillment_api;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{ActivityStore, FulfillmentDatabase, InsertTransactionResult};
pub use fulfillment_api::{
    FulfillmentApi,
    FulfillmentError,
    FulfillmentPolicy,
    FulfillmentProvider,
    QueueRunSummary,
    RunGuard,
    RunOutcome,
    RunPermit,
    SubmissionOutcome,
    SweepSummary,
    SyncOutcome,
    DEFAULT_MAX_RETRIES,
    DEFAULT_QUEUE_BATCH_SIZE,
    DEFAULT_RECONCILE_BATCH_SIZE,
};
