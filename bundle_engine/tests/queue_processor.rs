mod support;

use bundle_engine::{
    db_types::{NotificationKind, TransactionStatus},
    events::EventProducers,
    FulfillmentApi,
    FulfillmentDatabase,
    FulfillmentPolicy,
    RunOutcome,
    SqliteDatabase,
    SubmissionOutcome,
};
use bundle_provider::{PlaceOrderRequest, ProviderError, ProviderStatus};
use support::*;

type TestApi = FulfillmentApi<SqliteDatabase, MockProvider>;

fn api(db: &SqliteDatabase, provider: MockProvider, producers: EventProducers) -> TestApi {
    FulfillmentApi::new(db.clone(), provider, producers)
}

#[tokio::test]
async fn accepted_order_is_linked_and_left_for_reconciliation() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-1001").await;
    let mut provider = MockProvider::new();
    provider
        .expect_place_order()
        .withf(|req: &PlaceOrderRequest| req.reference == "BDL-1001" && req.recipient_phone == "0244000000")
        .times(1)
        .returning(|_| Ok(accepted(ProviderStatus::Processing, "PRV-77")));
    let (producers, mut events) = EventLog::new();
    let api = api(&db, provider, producers);

    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.candidates, 1);
    assert_eq!(summary.accepted, 1);
    assert_eq!(summary.delivered, 0);

    let tx = fetch(&db, "BDL-1001").await;
    assert_eq!(tx.status, TransactionStatus::Processing);
    assert_eq!(tx.provider_order_id.as_deref(), Some("PRV-77"));
    assert_eq!(tx.retries, 0);
    assert!(tx.last_error.is_none());
    assert_eq!(tx.metadata()["provider_status"], "processing");
    assert_eq!(tx.metadata()["provider_offer_slug"], "mtn_data_bundle");
    assert!(tx.metadata().contains_key("submitted_at"));
    assert!(events.notifications().is_empty());
    assert!(events.activity_logs().is_empty());

    // The transaction now belongs to the sweeper, so a second run sends nothing
    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.candidates, 0);
}

#[tokio::test]
async fn acceptance_without_an_order_id_falls_back_to_our_reference() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-1002").await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(1).returning(|_| {
        Ok(placement(bundle_provider::PlacementOutcome::Accepted, ProviderStatus::Processing, None))
    });
    let (producers, _events) = EventLog::new();
    let api = api(&db, provider, producers);
    api.process_queue().await.expect("queue run failed");
    let tx = fetch(&db, "BDL-1002").await;
    assert_eq!(tx.provider_order_id.as_deref(), Some("BDL-1002"));
    assert_eq!(tx.status, TransactionStatus::Processing);
}

#[tokio::test]
async fn immediate_delivery_notifies_the_customer_once() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-2001").await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(1).returning(|_| Ok(accepted(ProviderStatus::Completed, "PRV-1")));
    let (producers, mut events) = EventLog::new();
    let api = api(&db, provider, producers);

    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.delivered, 1);
    let tx = fetch(&db, "BDL-2001").await;
    assert_eq!(tx.status, TransactionStatus::Success);
    let notifications = events.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Success);
    assert_eq!(notifications[0].user_id, "user-42");
    assert!(events.activity_logs().is_empty());
}

#[tokio::test]
async fn unreachable_provider_uses_up_retries_then_fails() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-3001").await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(5).returning(|_| Ok(unreachable("Request timed out")));
    let (producers, mut events) = EventLog::new();
    let api = api(&db, provider, producers);

    for attempt in 1..=4 {
        let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
        assert_eq!(summary.retry_scheduled, 1);
        let tx = fetch(&db, "BDL-3001").await;
        assert_eq!(tx.retries, attempt);
        assert_eq!(tx.status, TransactionStatus::Processing);
        assert!(tx.last_error.as_deref().is_some_and(|e| e.contains("Request timed out")));
        assert!(events.notifications().is_empty());
    }
    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.failed, 1);
    let tx = fetch(&db, "BDL-3001").await;
    assert_eq!(tx.retries, 5);
    assert_eq!(tx.status, TransactionStatus::Failed);

    // Further runs never touch it again
    for _ in 0..2 {
        let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
        assert_eq!(summary.candidates, 0);
    }
    let notifications = events.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    let logs = events.activity_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, "fulfillment_failed");
}

#[tokio::test]
async fn rejection_uses_up_a_retry() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-3002").await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(1).returning(|_| Ok(rejected("Insufficient wallet balance")));
    let (producers, mut events) = EventLog::new();
    let api = api(&db, provider, producers);

    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.retry_scheduled, 1);
    let tx = fetch(&db, "BDL-3002").await;
    assert_eq!(tx.retries, 1);
    assert_eq!(tx.status, TransactionStatus::Processing);
    assert!(tx.last_error.as_deref().is_some_and(|e| e.contains("Insufficient wallet balance")));
    assert!(tx.metadata().contains_key("last_attempt_at"));
    assert!(events.notifications().is_empty());
}

#[tokio::test]
async fn invalid_phone_fails_without_using_a_retry() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-4001").await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(1).returning(|_| Err(ProviderError::InvalidPhone("12345".into())));
    let (producers, mut events) = EventLog::new();
    let api = api(&db, provider, producers);

    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.failed, 1);
    let tx = fetch(&db, "BDL-4001").await;
    assert_eq!(tx.status, TransactionStatus::Failed);
    assert_eq!(tx.retries, 0);
    assert!(tx.last_error.as_deref().is_some_and(|e| e.contains("12345")));
    assert_eq!(events.notifications().len(), 1);
    assert_eq!(events.activity_logs().len(), 1);
}

#[tokio::test]
async fn missing_offer_fails_without_using_a_retry() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-4002").await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(1).returning(|_| Err(ProviderError::NoOfferAvailable("MTN".into())));
    let (producers, mut events) = EventLog::new();
    let api = api(&db, provider, producers);

    api.process_queue().await.expect("queue run failed");
    let tx = fetch(&db, "BDL-4002").await;
    assert_eq!(tx.status, TransactionStatus::Failed);
    assert_eq!(tx.retries, 0);
    assert_eq!(events.notifications().len(), 1);
}

#[tokio::test]
async fn missing_api_key_uses_up_retries_until_the_order_fails() {
    let db = prepare_test_env().await;
    insert(&db, "BDL-5001").await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(5).returning(|_| Err(ProviderError::MissingApiKey));
    let (producers, mut events) = EventLog::new();
    let api = api(&db, provider, producers);

    for attempt in 1..=4 {
        let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
        assert_eq!(summary.retry_scheduled, 1);
        let tx = fetch(&db, "BDL-5001").await;
        assert_eq!(tx.status, TransactionStatus::Processing);
        assert_eq!(tx.retries, attempt);
    }
    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.failed, 1);
    // A failed order is no longer a candidate
    for _ in 0..5 {
        let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
        assert_eq!(summary.candidates, 0);
    }
    let tx = fetch(&db, "BDL-5001").await;
    assert_eq!(tx.status, TransactionStatus::Failed);
    assert_eq!(tx.retries, 5);
    assert!(tx.last_error.as_deref().is_some_and(|e| e.contains("API key")));
    let notifications = events.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert_eq!(events.activity_logs().len(), 1);
}

#[tokio::test]
async fn one_bad_transaction_does_not_stop_the_batch() {
    let db = prepare_test_env().await;
    for i in 1..=3 {
        insert(&db, &format!("BDL-600{i}")).await;
    }
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(3).returning(|req: &PlaceOrderRequest| {
        if req.reference == "BDL-6002" {
            Err(ProviderError::InvalidVolume("lots".into()))
        } else {
            Ok(accepted(ProviderStatus::Processing, &format!("PRV-{}", req.reference)))
        }
    });
    let (producers, _events) = EventLog::new();
    let api = api(&db, provider, producers);

    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(fetch(&db, "BDL-6001").await.provider_order_id.as_deref(), Some("PRV-BDL-6001"));
    assert_eq!(fetch(&db, "BDL-6002").await.status, TransactionStatus::Failed);
    assert_eq!(fetch(&db, "BDL-6003").await.provider_order_id.as_deref(), Some("PRV-BDL-6003"));
}

#[tokio::test]
async fn batches_are_bounded_and_oldest_first() {
    let db = prepare_test_env().await;
    for i in 1..=7 {
        insert(&db, &format!("BDL-70{i:02}")).await;
    }
    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_in_mock = seen.clone();
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(7).returning(move |req: &PlaceOrderRequest| {
        seen_in_mock.lock().unwrap().push(req.reference.clone());
        Ok(accepted(ProviderStatus::Processing, &format!("PRV-{}", req.reference)))
    });
    let (producers, _events) = EventLog::new();
    let policy = FulfillmentPolicy { queue_batch_size: 5, ..Default::default() };
    let api = api(&db, provider, producers).with_policy(policy);

    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.candidates, 5);
    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.candidates, 2);
    let expected = (1..=7).map(|i| format!("BDL-70{i:02}")).collect::<Vec<_>>();
    assert_eq!(*seen.lock().unwrap(), expected);
}

#[tokio::test]
async fn terminal_and_linked_transactions_are_never_submitted() {
    let db = prepare_test_env().await;
    insert_tx(&db, new_transaction("BDL-8001").with_status(TransactionStatus::Success)).await;
    insert_tx(&db, new_transaction("BDL-8002").with_status(TransactionStatus::Failed)).await;
    insert_submitted(&db, "BDL-8003", "PRV-8003").await;
    // No expectations: any call panics
    let provider = MockProvider::new();
    let (producers, _events) = EventLog::new();
    let api = api(&db, provider, producers);

    let summary = api.process_queue().await.expect("queue run failed").completed().expect("run was skipped");
    assert_eq!(summary.candidates, 0);
}

#[tokio::test]
async fn queued_transactions_are_submitted_like_processing_ones() {
    let db = prepare_test_env().await;
    insert_tx(&db, new_transaction("BDL-8101").with_status(TransactionStatus::Queued)).await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(1).returning(|_| Ok(accepted(ProviderStatus::Processing, "PRV-8101")));
    let (producers, _events) = EventLog::new();
    let api = api(&db, provider, producers);

    api.process_queue().await.expect("queue run failed");
    let tx = fetch(&db, "BDL-8101").await;
    assert_eq!(tx.status, TransactionStatus::Processing);
    assert_eq!(tx.provider_order_id.as_deref(), Some("PRV-8101"));
}

#[tokio::test]
async fn submitting_a_stale_copy_sends_nothing() {
    let db = prepare_test_env().await;
    let stale = insert(&db, "BDL-9001").await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(1).returning(|_| Ok(accepted(ProviderStatus::Processing, "PRV-9001")));
    let (producers, _events) = EventLog::new();
    let api = api(&db, provider, producers);

    let first = api.submit_transaction(stale.clone()).await.expect("submission failed");
    assert_eq!(first, SubmissionOutcome::Accepted { status: TransactionStatus::Processing });
    // The copy we hold still looks unsubmitted, but the stored record has moved on
    let second = api.submit_transaction(stale).await.expect("submission failed");
    assert_eq!(second, SubmissionOutcome::Skipped);
}

#[tokio::test]
async fn existing_metadata_survives_submission() {
    let db = prepare_test_env().await;
    let tx = new_transaction("BDL-9101").with_metadata("source", serde_json::json!("checkout"));
    insert_tx(&db, tx).await;
    let mut provider = MockProvider::new();
    provider.expect_place_order().times(1).returning(|_| Ok(accepted(ProviderStatus::Processing, "PRV-9101")));
    let (producers, _events) = EventLog::new();
    let api = api(&db, provider, producers);

    api.process_queue().await.expect("queue run failed");
    let tx = fetch(&db, "BDL-9101").await;
    assert_eq!(tx.metadata()["source"], "checkout");
    assert_eq!(tx.metadata()["provider_response"]["data"]["orderId"], "PRV-9101");
}

#[tokio::test]
async fn empty_queue_is_a_completed_run() {
    let db = prepare_test_env().await;
    let (producers, _events) = EventLog::new();
    let api = api(&db, MockProvider::new(), producers);
    match api.process_queue().await.expect("queue run failed") {
        RunOutcome::Completed(summary) => assert_eq!(summary.candidates, 0),
        RunOutcome::Skipped => panic!("run should not have been skipped"),
    }
    assert!(db.fetch_submission_candidates(10, 5).await.expect("query failed").is_empty());
}
