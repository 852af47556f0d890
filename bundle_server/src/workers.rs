use bundle_engine::{FulfillmentApi, RunOutcome, SqliteDatabase};
use bundle_provider::ProviderApi;
use log::*;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::config::WorkerConfig;

pub type BundleApi = FulfillmentApi<SqliteDatabase, ProviderApi>;

/// Starts the queue worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// After `start_delay`, the queue processor is triggered every `queue_interval`. Each run is spawned on its own task,
/// so a slow run never holds up the timer. If the previous run is still going when the timer fires, the new trigger
/// is skipped by the processor's run guard.
pub fn start_queue_worker(api: BundleApi, config: WorkerConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(config.start_delay).await;
        let mut timer = tokio::time::interval(config.queue_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Queue worker started. Running every {}s", config.queue_interval.as_secs());
        loop {
            timer.tick().await;
            let api = api.clone();
            tokio::spawn(async move {
                trace!("🕰️ Triggering the queue processor");
                match api.process_queue().await {
                    Ok(RunOutcome::Completed(summary)) => debug!("🕰️ Queue run finished. {summary}"),
                    Ok(RunOutcome::Skipped) => debug!("🕰️ The previous queue run is still in progress"),
                    Err(e) => error!("🕰️ Error running the queue processor: {e}"),
                }
            });
        }
    })
}

/// Starts the reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_reconciliation_worker(api: BundleApi, config: WorkerConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(config.start_delay).await;
        let mut timer = tokio::time::interval(config.reconcile_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Reconciliation worker started. Running every {}s", config.reconcile_interval.as_secs());
        loop {
            timer.tick().await;
            let api = api.clone();
            tokio::spawn(async move {
                trace!("🕰️ Triggering a reconciliation sweep");
                match api.reconcile().await {
                    Ok(RunOutcome::Completed(summary)) => debug!("🕰️ Reconciliation sweep finished. {summary}"),
                    Ok(RunOutcome::Skipped) => debug!("🕰️ The previous reconciliation sweep is still in progress"),
                    Err(e) => error!("🕰️ Error running the reconciliation sweeper: {e}"),
                }
            });
        }
    })
}
