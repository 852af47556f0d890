//! # Persistence contracts
//!
//! The engine never talks to a database directly. Backends implement these traits instead.
//!
//! * [`FulfillmentDatabase`] stores transactions and answers the two eligibility queries that drive the queue
//!   processor and the reconciliation sweeper.
//! * [`ActivityStore`] keeps a record of the notifications and activity-log entries that the engine emits.
mod activity_store;
mod data_objects;
mod fulfillment_database;

pub use activity_store::ActivityStore;
pub use data_objects::InsertTransactionResult;
pub use fulfillment_database::FulfillmentDatabase;
