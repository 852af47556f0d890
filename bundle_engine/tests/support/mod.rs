#![allow(dead_code)]

use bundle_engine::{
    db_types::{Network, NewTransaction, Transaction, TransactionUpdate},
    events::{ActivityLogEvent, EventProducer, EventProducers, NotificationEvent},
    FulfillmentDatabase,
    FulfillmentProvider,
    SqliteDatabase,
};
use bundle_provider::{
    OrderPlacement,
    OrderStatusReport,
    PlaceOrderRequest,
    PlacementOutcome,
    ProviderError,
    ProviderStatus,
};
use mockall::mock;
use serde_json::{json, Value};
use tokio::sync::mpsc;

mock! {
    pub Provider {}
    impl FulfillmentProvider for Provider {
        async fn place_order(&self, request: &PlaceOrderRequest) -> Result<OrderPlacement, ProviderError>;
        async fn check_order_status(&self, id_or_reference: &str) -> Result<OrderStatusReport, ProviderError>;
    }
}

pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating database");
    db.run_migrations().await.expect("Error running migrations");
    db
}

/// Collects everything the engine publishes, in order.
pub struct EventLog {
    notifications: mpsc::Receiver<NotificationEvent>,
    activity_logs: mpsc::Receiver<ActivityLogEvent>,
}

impl EventLog {
    pub fn new() -> (EventProducers, Self) {
        let (n_tx, notifications) = mpsc::channel(100);
        let (a_tx, activity_logs) = mpsc::channel(100);
        let producers = EventProducers {
            notification_producer: vec![EventProducer::new(n_tx)],
            activity_log_producer: vec![EventProducer::new(a_tx)],
        };
        (producers, Self { notifications, activity_logs })
    }

    pub fn notifications(&mut self) -> Vec<NotificationEvent> {
        let mut result = Vec::new();
        while let Ok(ev) = self.notifications.try_recv() {
            result.push(ev);
        }
        result
    }

    pub fn activity_logs(&mut self) -> Vec<ActivityLogEvent> {
        let mut result = Vec::new();
        while let Ok(ev) = self.activity_logs.try_recv() {
            result.push(ev);
        }
        result
    }
}

pub fn new_transaction(reference: &str) -> NewTransaction {
    NewTransaction::new(reference, "user-42", Network::Mtn, "1GB", "0244000000")
}

pub async fn insert(db: &SqliteDatabase, reference: &str) -> Transaction {
    insert_tx(db, new_transaction(reference)).await
}

pub async fn insert_tx(db: &SqliteDatabase, tx: NewTransaction) -> Transaction {
    let reference = tx.reference.clone();
    db.insert_transaction(tx).await.expect("Error inserting transaction");
    fetch(db, &reference).await
}

/// Inserts a transaction that the provider has already accepted as `provider_order_id`.
pub async fn insert_submitted(db: &SqliteDatabase, reference: &str, provider_order_id: &str) -> Transaction {
    let tx = insert(db, reference).await;
    let update = TransactionUpdate::default().with_provider_order_id(provider_order_id);
    db.update_transaction(tx.id, update).await.expect("Error updating transaction")
}

pub async fn fetch(db: &SqliteDatabase, reference: &str) -> Transaction {
    db.fetch_transaction_by_reference(reference)
        .await
        .expect("Error fetching transaction")
        .expect("Transaction does not exist")
}

pub fn placement(outcome: PlacementOutcome, status: ProviderStatus, provider_order_id: Option<&str>) -> OrderPlacement {
    let raw = match provider_order_id {
        Some(id) => json!({ "success": true, "data": { "orderId": id } }),
        None => Value::Null,
    };
    OrderPlacement {
        outcome,
        status,
        provider_status: Some(status.to_string()),
        raw,
        provider_order_id: provider_order_id.map(String::from),
        provider_reference: None,
        offer_slug: "mtn_data_bundle".to_string(),
        volume_gb: 1.0,
    }
}

pub fn accepted(status: ProviderStatus, provider_order_id: &str) -> OrderPlacement {
    placement(PlacementOutcome::Accepted, status, Some(provider_order_id))
}

pub fn unreachable(msg: &str) -> OrderPlacement {
    placement(PlacementOutcome::Unreachable(msg.to_string()), ProviderStatus::Processing, None)
}

pub fn rejected(msg: &str) -> OrderPlacement {
    placement(PlacementOutcome::Rejected(msg.to_string()), ProviderStatus::Processing, None)
}

pub fn status_report(status: ProviderStatus, raw_status: &str) -> OrderStatusReport {
    OrderStatusReport {
        status,
        provider_status: Some(raw_status.to_string()),
        raw: json!({ "success": true, "data": { "status": raw_status } }),
    }
}
