use chrono::Utc;
use log::*;
use serde_json::{json, Value};

use super::{
    queue_processor::status_from_provider,
    FulfillmentApi,
    FulfillmentError,
    FulfillmentProvider,
    RunOutcome,
    SweepSummary,
    SyncOutcome,
};
use crate::{
    db::traits::FulfillmentDatabase,
    db_types::{FulfillmentPhase, Transaction, TransactionUpdate},
    events::ActivityLogEvent,
};

impl<B, P> FulfillmentApi<B, P>
where
    B: FulfillmentDatabase,
    P: FulfillmentProvider,
{
    /// Runs one reconciliation sweep over transactions that the provider has accepted but not finished.
    ///
    /// Each transaction is checked on its own; a failure is logged and the sweep moves on.
    pub async fn reconcile(&self) -> Result<RunOutcome<SweepSummary>, FulfillmentError> {
        let Some(_permit) = self.sweep_guard.try_acquire() else {
            debug!("🔁️ A reconciliation sweep is already in progress. Skipping this one");
            return Ok(RunOutcome::Skipped);
        };
        let candidates = self
            .db
            .fetch_reconciliation_candidates(self.policy.reconcile_batch_size)
            .await
            .map_err(FulfillmentError::persistence)?;
        let mut summary = SweepSummary { checked: candidates.len(), ..Default::default() };
        if candidates.is_empty() {
            trace!("🔁️ Nothing to reconcile");
            return Ok(RunOutcome::Completed(summary));
        }
        debug!("🔁️ Reconciling {} transactions", candidates.len());
        for tx in candidates {
            match self.reconcile_transaction(&tx).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    error!("🔁️ Could not reconcile {} (#{}). {e}", tx.reference, tx.id);
                    let entry = ActivityLogEvent::sync_error(&tx, &e.to_string());
                    self.producers.publish_activity_log(entry).await;
                    summary.errors += 1;
                },
            }
        }
        info!("🔁️ Reconciliation sweep complete. {summary}");
        Ok(RunOutcome::Completed(summary))
    }

    /// Asks the provider about a single transaction and stores the answer.
    ///
    /// The provider's status snapshot is always merged into the metadata. The status is only written, and the
    /// customer only notified, when it actually changes. An `Err` means the result could not be persisted.
    pub async fn reconcile_transaction(&self, tx: &Transaction) -> Result<SyncOutcome, FulfillmentError> {
        if tx.phase() != FulfillmentPhase::AwaitingCompletion {
            return Ok(SyncOutcome::Skipped);
        }
        let Some(lookup_id) = tx.provider_lookup_id() else {
            return Ok(SyncOutcome::Skipped);
        };
        let now = Value::String(Utc::now().to_rfc3339());
        let report = match self.provider.check_order_status(lookup_id).await {
            Ok(report) => report,
            Err(e) => {
                warn!("🔁️ Status check for {} ({lookup_id}) failed. {e}", tx.reference);
                let update = TransactionUpdate::default()
                    .with_metadata("last_sync_error", Value::String(e.to_string()))
                    .with_metadata("last_sync_attempt_at", now);
                self.db.update_transaction(tx.id, update).await.map_err(FulfillmentError::persistence)?;
                return Ok(SyncOutcome::ProviderError(e.to_string()));
            },
        };
        let new_status = status_from_provider(report.status);
        let mut update = TransactionUpdate::default()
            .with_metadata("provider_status", json!(report.provider_status))
            .with_metadata("last_synced_at", now.clone())
            .with_metadata("last_sync_attempt_at", now)
            .with_metadata("last_sync_error", Value::Null);
        let changed = new_status != tx.status;
        if changed {
            update = update.with_status(new_status).with_metadata("provider_sync", report.raw);
        }
        let updated = self.db.update_transaction(tx.id, update).await.map_err(FulfillmentError::persistence)?;
        if !changed {
            trace!("🔁️ {} is still {}", tx.reference, tx.status);
            return Ok(SyncOutcome::Unchanged);
        }
        info!("🔁️ {} moved from {} to {} according to the provider", tx.reference, tx.status, updated.status);
        if updated.status.is_terminal() {
            let reason = report.provider_status.map(|s| format!("Provider reported status '{s}'"));
            self.announce_terminal(&updated, reason.as_deref()).await;
        }
        Ok(SyncOutcome::Updated { from: tx.status, to: updated.status })
    }
}
