use bundle_provider::{OrderPlacement, PlaceOrderRequest, PlacementOutcome, ProviderStatus};
use chrono::Utc;
use log::*;
use serde_json::{json, Value};

use super::{
    FulfillmentApi,
    FulfillmentError,
    FulfillmentProvider,
    QueueRunSummary,
    RunOutcome,
    SubmissionOutcome,
};
use crate::{
    db::traits::FulfillmentDatabase,
    db_types::{FulfillmentPhase, Transaction, TransactionStatus, TransactionUpdate},
};

pub(crate) fn status_from_provider(status: ProviderStatus) -> TransactionStatus {
    match status {
        ProviderStatus::Processing => TransactionStatus::Processing,
        ProviderStatus::Completed => TransactionStatus::Success,
        ProviderStatus::Failed => TransactionStatus::Failed,
    }
}

impl<B, P> FulfillmentApi<B, P>
where
    B: FulfillmentDatabase,
    P: FulfillmentProvider,
{
    /// Runs one pass of the queue processor.
    ///
    /// Up to `queue_batch_size` transactions awaiting submission are sent to the provider, oldest first and one at a
    /// time. A failure on one transaction is logged and does not stop the batch. Only failing to load the batch is an
    /// error.
    pub async fn process_queue(&self) -> Result<RunOutcome<QueueRunSummary>, FulfillmentError> {
        let Some(_permit) = self.queue_guard.try_acquire() else {
            debug!("📤️ A queue run is already in progress. Skipping this one");
            return Ok(RunOutcome::Skipped);
        };
        let candidates = self
            .db
            .fetch_submission_candidates(self.policy.queue_batch_size, self.policy.max_retries)
            .await
            .map_err(FulfillmentError::persistence)?;
        let mut summary = QueueRunSummary { candidates: candidates.len(), ..Default::default() };
        if candidates.is_empty() {
            trace!("📤️ No transactions waiting for submission");
            return Ok(RunOutcome::Completed(summary));
        }
        debug!("📤️ {} transactions waiting for submission", candidates.len());
        for tx in candidates {
            let id = tx.id;
            let reference = tx.reference.clone();
            match self.submit_transaction(tx).await {
                Ok(outcome) => {
                    trace!("📤️ {reference}: {outcome:?}");
                    summary.record(&outcome);
                },
                Err(e) => {
                    error!("📤️ Could not process transaction {reference} (#{id}). {e}");
                    summary.errors += 1;
                },
            }
        }
        info!("📤️ Queue run complete. {summary}");
        Ok(RunOutcome::Completed(summary))
    }

    /// Submits a single transaction to the provider and records the result.
    ///
    /// The transaction is re-read first; if it is no longer awaiting submission (or has used up its retries) nothing
    /// is sent. An `Err` means the result could not be persisted.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<SubmissionOutcome, FulfillmentError> {
        let tx = match self.db.fetch_transaction(tx.id).await.map_err(FulfillmentError::persistence)? {
            Some(fresh) => fresh,
            None => {
                warn!("📤️ Transaction {} (#{}) has disappeared. Skipping", tx.reference, tx.id);
                return Ok(SubmissionOutcome::Skipped);
            },
        };
        if tx.phase() != FulfillmentPhase::AwaitingSubmission || tx.retries >= self.policy.max_retries {
            let phase = tx.phase();
            debug!("📤️ Transaction {} is {phase} with {} retries. Not submitting", tx.reference, tx.retries);
            return Ok(SubmissionOutcome::Skipped);
        }
        let request = PlaceOrderRequest::new(
            tx.network,
            tx.data_amount.as_str(),
            tx.recipient_phone.as_str(),
            tx.reference.as_str(),
        );
        debug!("📤️ Submitting {} (attempt {} of {})", tx.reference, tx.retries + 1, self.policy.max_retries);
        match self.provider.place_order(&request).await {
            Ok(placement) => match placement.outcome.clone() {
                PlacementOutcome::Accepted => self.record_acceptance(&tx, placement).await,
                PlacementOutcome::Unreachable(msg) => {
                    self.record_failure(&tx, FulfillmentError::ProviderUnavailable(msg)).await
                },
                PlacementOutcome::Rejected(msg) => {
                    self.record_failure(&tx, FulfillmentError::ProviderRejected(msg)).await
                },
            },
            Err(e) => self.record_failure(&tx, e.into()).await,
        }
    }

    async fn record_acceptance(
        &self,
        tx: &Transaction,
        placement: OrderPlacement,
    ) -> Result<SubmissionOutcome, FulfillmentError> {
        let status = status_from_provider(placement.status);
        let order_id = placement.provider_order_id.clone().unwrap_or_else(|| tx.reference.clone());
        let now = Utc::now().to_rfc3339();
        let mut update = TransactionUpdate::default()
            .with_status(status)
            .with_provider_order_id(order_id.as_str())
            .clear_last_error()
            .with_metadata("provider_status", json!(placement.provider_status))
            .with_metadata("provider_offer_slug", json!(placement.offer_slug))
            .with_metadata("provider_volume_gb", json!(placement.volume_gb))
            .with_metadata("provider_response", placement.raw)
            .with_metadata("submitted_at", Value::String(now.clone()))
            .with_metadata("last_synced_at", Value::String(now));
        if let Some(reference) = placement.provider_reference {
            update = update.with_provider_reference(reference);
        }
        let updated = self.db.update_transaction(tx.id, update).await.map_err(FulfillmentError::persistence)?;
        info!("📤️ {} accepted by the provider as {order_id}. Status is now {}", tx.reference, updated.status);
        if updated.status.is_terminal() {
            self.announce_terminal(&updated, None).await;
        }
        Ok(SubmissionOutcome::Accepted { status: updated.status })
    }

    /// Books a failed attempt.
    ///
    /// * Fatal errors fail the transaction immediately, leaving the retry counter alone.
    /// * Anything else uses up a retry, and fails the transaction once the ceiling is reached.
    async fn record_failure(
        &self,
        tx: &Transaction,
        err: FulfillmentError,
    ) -> Result<SubmissionOutcome, FulfillmentError> {
        let reason = err.to_string();
        let now = Value::String(Utc::now().to_rfc3339());
        let (update, outcome) = if err.is_fatal() {
            warn!("📤️ {} cannot be fulfilled. {reason}", tx.reference);
            let update = TransactionUpdate::default().with_status(TransactionStatus::Failed);
            (update, SubmissionOutcome::Failed { retries: tx.retries })
        } else {
            let retries = tx.retries + 1;
            if retries >= self.policy.max_retries {
                warn!("📤️ {} failed on attempt {retries}. Giving up. {reason}", tx.reference);
                let update = TransactionUpdate::default().with_status(TransactionStatus::Failed).with_retries(retries);
                (update, SubmissionOutcome::Failed { retries })
            } else {
                info!("📤️ {} failed on attempt {retries}. Will retry. {reason}", tx.reference);
                (TransactionUpdate::default().with_retries(retries), SubmissionOutcome::RetryScheduled { retries })
            }
        };
        let update = update.with_last_error(reason.as_str()).with_metadata("last_attempt_at", now);
        let updated = self.db.update_transaction(tx.id, update).await.map_err(FulfillmentError::persistence)?;
        if updated.status.is_terminal() {
            self.announce_terminal(&updated, Some(reason.as_str())).await;
        }
        Ok(outcome)
    }
}
