//! # Fulfillment pipeline
//!
//! [`FulfillmentApi`] drives paid-for transactions through the provider in two independent loops:
//!
//! * The queue processor ([`FulfillmentApi::process_queue`]) submits transactions the provider has not accepted yet,
//!   with a bounded number of retries.
//! * The reconciliation sweeper ([`FulfillmentApi::reconcile`]) polls the provider for transactions it has accepted
//!   but not yet delivered, and converges our record to the provider's answer.
//!
//! Each loop is protected by its own [`RunGuard`]; triggering a loop while it is already running is a no-op. Status
//! changes are committed first, and only then announced through the notification and activity-log events.
//!
//! ```rust,ignore
//! let db = SqliteDatabase::new_with_url("sqlite://data/bundle_store.db", 5).await?;
//! let provider = ProviderApi::new(ProviderConfig::new_from_env_or_default())?;
//! let api = FulfillmentApi::new(db, provider, producers);
//! if let RunOutcome::Completed(summary) = api.process_queue().await? {
//!     println!("{summary}");
//! }
//! ```
mod errors;
mod fulfillment_objects;
mod provider;
mod queue_processor;
mod reconciliation;
mod run_guard;

use std::{fmt::Debug, sync::Arc};

pub use errors::FulfillmentError;
pub use fulfillment_objects::{
    FulfillmentPolicy,
    QueueRunSummary,
    SubmissionOutcome,
    SweepSummary,
    SyncOutcome,
    DEFAULT_MAX_RETRIES,
    DEFAULT_QUEUE_BATCH_SIZE,
    DEFAULT_RECONCILE_BATCH_SIZE,
};
use log::*;
pub use provider::FulfillmentProvider;
pub use run_guard::{RunGuard, RunOutcome, RunPermit};

use crate::{
    db_types::{Transaction, TransactionStatus},
    events::{ActivityLogEvent, EventProducers, NotificationEvent},
};

pub struct FulfillmentApi<B, P> {
    db: B,
    provider: Arc<P>,
    producers: EventProducers,
    policy: FulfillmentPolicy,
    queue_guard: RunGuard,
    sweep_guard: RunGuard,
}

impl<B: Clone, P> Clone for FulfillmentApi<B, P> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            provider: Arc::clone(&self.provider),
            producers: self.producers.clone(),
            policy: self.policy,
            queue_guard: self.queue_guard.clone(),
            sweep_guard: self.sweep_guard.clone(),
        }
    }
}

impl<B, P> Debug for FulfillmentApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentApi ({:?})", self.policy)
    }
}

impl<B, P> FulfillmentApi<B, P> {
    pub fn new(db: B, provider: P, producers: EventProducers) -> Self {
        Self::new_with_shared_provider(db, Arc::new(provider), producers)
    }

    pub fn new_with_shared_provider(db: B, provider: Arc<P>, producers: EventProducers) -> Self {
        Self {
            db,
            provider,
            producers,
            policy: FulfillmentPolicy::default(),
            queue_guard: RunGuard::new(),
            sweep_guard: RunGuard::new(),
        }
    }

    pub fn with_policy(mut self, policy: FulfillmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &FulfillmentPolicy {
        &self.policy
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn provider(&self) -> &P {
        self.provider.as_ref()
    }

    /// True while a queue run holds its guard
    pub fn is_queue_running(&self) -> bool {
        self.queue_guard.is_running()
    }

    /// True while a reconciliation sweep holds its guard
    pub fn is_sweep_running(&self) -> bool {
        self.sweep_guard.is_running()
    }

    /// Announces a transition into a terminal status. Failures also go to the activity log.
    async fn announce_terminal(&self, tx: &Transaction, reason: Option<&str>) {
        if let Some(notification) = NotificationEvent::for_terminal_transaction(tx) {
            trace!("📬️ Publishing {} notification for {}", notification.kind, tx.reference);
            self.producers.publish_notification(notification).await;
        }
        if tx.status == TransactionStatus::Failed {
            let reason = reason.or(tx.last_error.as_deref()).unwrap_or("No reason given");
            self.producers.publish_activity_log(ActivityLogEvent::transaction_failed(tx, reason)).await;
        }
    }
}
