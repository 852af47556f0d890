mod support;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use bundle_engine::{FulfillmentApi, FulfillmentProvider, RunOutcome};
use bundle_provider::{OrderPlacement, OrderStatusReport, PlaceOrderRequest, ProviderError, ProviderStatus};
use support::*;

/// A provider that takes its time, so that overlapping runs can be observed.
#[derive(Default)]
struct SlowProvider {
    placements: AtomicUsize,
    status_checks: AtomicUsize,
}

const DELAY: Duration = Duration::from_millis(200);

impl FulfillmentProvider for SlowProvider {
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderPlacement, ProviderError> {
        self.placements.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(DELAY).await;
        Ok(accepted(ProviderStatus::Processing, &format!("PRV-{}", request.reference)))
    }

    async fn check_order_status(&self, _id_or_reference: &str) -> Result<OrderStatusReport, ProviderError> {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(DELAY).await;
        Ok(status_report(ProviderStatus::Processing, "pending"))
    }
}

#[tokio::test]
async fn overlapping_queue_runs_are_skipped() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-1001").await;
    let provider = Arc::new(SlowProvider::default());
    let (producers, _events) = EventLog::new();
    let api = FulfillmentApi::new_with_shared_provider(db.clone(), Arc::clone(&provider), producers);
    let other = api.clone();

    let (first, second) = tokio::join!(api.process_queue(), other.process_queue());
    let first = first.expect("queue run failed");
    let second = second.expect("queue run failed");
    assert!(matches!(first, RunOutcome::Completed(_)));
    assert!(second.is_skipped());
    assert_eq!(provider.placements.load(Ordering::SeqCst), 1);
    assert!(!api.is_queue_running());

    // The guard is released once the run ends
    let third = api.process_queue().await.expect("queue run failed");
    assert!(!third.is_skipped());
}

#[tokio::test]
async fn overlapping_sweeps_are_skipped() {
    let db = prepare_test_env().await;
    insert_submitted(&db, "BDL-2001", "PRV-2001").await;
    let provider = Arc::new(SlowProvider::default());
    let (producers, _events) = EventLog::new();
    let api = FulfillmentApi::new_with_shared_provider(db.clone(), Arc::clone(&provider), producers);

    let (first, second) = tokio::join!(api.reconcile(), api.reconcile());
    assert!(!first.expect("sweep failed").is_skipped());
    assert!(second.expect("sweep failed").is_skipped());
    assert_eq!(provider.status_checks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn queue_and_sweep_guards_are_independent() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-3001").await;
    insert_submitted(&db, "BDL-3002", "PRV-3002").await;
    let provider = Arc::new(SlowProvider::default());
    let (producers, _events) = EventLog::new();
    let api = FulfillmentApi::new_with_shared_provider(db.clone(), Arc::clone(&provider), producers);

    let (queue, sweep) = tokio::join!(api.process_queue(), api.reconcile());
    assert!(!queue.expect("queue run failed").is_skipped());
    assert!(!sweep.expect("sweep failed").is_skipped());
    assert_eq!(provider.placements.load(Ordering::SeqCst), 1);
    assert_eq!(provider.status_checks.load(Ordering::SeqCst), 1);
}
