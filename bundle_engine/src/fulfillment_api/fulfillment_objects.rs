use std::fmt::Display;

use serde::Serialize;

use crate::db_types::TransactionStatus;

pub const DEFAULT_QUEUE_BATCH_SIZE: i64 = 5;
pub const DEFAULT_RECONCILE_BATCH_SIZE: i64 = 50;
pub const DEFAULT_MAX_RETRIES: i64 = 5;

/// Batch sizes and the retry ceiling for the two fulfillment loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FulfillmentPolicy {
    /// Transactions submitted per queue run
    pub queue_batch_size: i64,
    /// Transactions checked per reconciliation sweep
    pub reconcile_batch_size: i64,
    /// Failed submissions allowed before a transaction is marked as failed
    pub max_retries: i64,
}

impl Default for FulfillmentPolicy {
    fn default() -> Self {
        Self {
            queue_batch_size: DEFAULT_QUEUE_BATCH_SIZE,
            reconcile_batch_size: DEFAULT_RECONCILE_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// What happened to a single transaction during a queue run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The provider accepted the order. `status` is the status we stored as a result.
    Accepted { status: TransactionStatus },
    /// The attempt failed and the transaction will be tried again on a later run.
    RetryScheduled { retries: i64 },
    /// The transaction was marked as failed.
    Failed { retries: i64 },
    /// Someone else moved the transaction on since it was selected.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueRunSummary {
    pub candidates: usize,
    pub accepted: usize,
    pub delivered: usize,
    pub retry_scheduled: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl QueueRunSummary {
    pub fn record(&mut self, outcome: &SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Accepted { status: TransactionStatus::Success } => {
                self.accepted += 1;
                self.delivered += 1;
            },
            SubmissionOutcome::Accepted { status: TransactionStatus::Failed } => {
                self.accepted += 1;
                self.failed += 1;
            },
            SubmissionOutcome::Accepted { .. } => self.accepted += 1,
            SubmissionOutcome::RetryScheduled { .. } => self.retry_scheduled += 1,
            SubmissionOutcome::Failed { .. } => self.failed += 1,
            SubmissionOutcome::Skipped => self.skipped += 1,
        }
    }
}

impl Display for QueueRunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} candidates: {} accepted ({} delivered), {} to retry, {} failed, {} skipped, {} errors",
            self.candidates,
            self.accepted,
            self.delivered,
            self.retry_scheduled,
            self.failed,
            self.skipped,
            self.errors
        )
    }
}

/// What happened to a single transaction during a reconciliation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    Updated { from: TransactionStatus, to: TransactionStatus },
    /// The provider could not tell us anything. The transaction is left for the next sweep.
    ProviderError(String),
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub checked: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub provider_errors: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl SweepSummary {
    pub fn record(&mut self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Updated { to, .. } => {
                self.updated += 1;
                match to {
                    TransactionStatus::Success => self.succeeded += 1,
                    TransactionStatus::Failed => self.failed += 1,
                    _ => {},
                }
            },
            SyncOutcome::ProviderError(_) => self.provider_errors += 1,
            SyncOutcome::Skipped => self.skipped += 1,
        }
    }
}

impl Display for SweepSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} checked: {} unchanged, {} updated ({} delivered, {} failed), {} provider errors, {} skipped, {} errors",
            self.checked,
            self.unchanged,
            self.updated,
            self.succeeded,
            self.failed,
            self.provider_errors,
            self.skipped,
            self.errors
        )
    }
}
