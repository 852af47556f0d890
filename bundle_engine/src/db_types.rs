use std::{fmt::Display, str::FromStr};

pub use bundle_common::Network;
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

/// Free-form key/value bag attached to a transaction. Updates are merged in, never replaced.
pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, Error)]
#[error("Invalid transaction status: {0}")]
pub struct ConversionError(String);

//--------------------------------------   TransactionStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Recorded but not yet picked up. Handled exactly like `Processing`.
    Queued,
    /// Either waiting to be submitted, or submitted and waiting for the provider to deliver. See [`FulfillmentPhase`].
    Processing,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Queued => write!(f, "queued"),
            TransactionStatus::Processing => write!(f, "processing"),
            TransactionStatus::Success => write!(f, "success"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid transaction status: {value}. This conversion cannot fail, so defaulting to processing");
            TransactionStatus::Processing
        })
    }
}

//--------------------------------------   FulfillmentPhase    ---------------------------------------------------------
/// Where a transaction is in the fulfillment pipeline.
///
/// The stored status uses `processing` for two different phases. They are told apart by whether the provider has
/// given us an order id or reference yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FulfillmentPhase {
    /// Not yet accepted by the provider. The queue processor owns the transaction.
    AwaitingSubmission,
    /// Accepted by the provider, not yet delivered. The reconciliation sweeper owns the transaction.
    AwaitingCompletion,
    Succeeded,
    Failed,
}

impl FulfillmentPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FulfillmentPhase::Succeeded | FulfillmentPhase::Failed)
    }
}

impl Display for FulfillmentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentPhase::AwaitingSubmission => write!(f, "awaiting submission"),
            FulfillmentPhase::AwaitingCompletion => write!(f, "awaiting completion"),
            FulfillmentPhase::Succeeded => write!(f, "succeeded"),
            FulfillmentPhase::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------      Transaction      ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: i64,
    /// Our own reference for the order. Unique, and shown to the customer.
    pub reference: String,
    pub user_id: String,
    pub network: Network,
    /// The bundle size as sold, e.g. "1GB"
    pub data_amount: String,
    pub recipient_phone: String,
    pub status: TransactionStatus,
    pub provider_order_id: Option<String>,
    pub provider_reference: Option<String>,
    pub retries: i64,
    pub last_error: Option<String>,
    pub metadata: Json<Metadata>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// True once the provider has handed back an order id or a reference for this transaction.
    pub fn has_provider_link(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.provider_order_id) || present(&self.provider_reference)
    }

    pub fn phase(&self) -> FulfillmentPhase {
        match self.status {
            TransactionStatus::Success => FulfillmentPhase::Succeeded,
            TransactionStatus::Failed => FulfillmentPhase::Failed,
            TransactionStatus::Queued | TransactionStatus::Processing if self.has_provider_link() => {
                FulfillmentPhase::AwaitingCompletion
            },
            TransactionStatus::Queued | TransactionStatus::Processing => FulfillmentPhase::AwaitingSubmission,
        }
    }

    /// The identifier to use when asking the provider about this order: its order id if we have one, otherwise the
    /// reference it echoed back.
    pub fn provider_lookup_id(&self) -> Option<&str> {
        [self.provider_order_id.as_deref(), self.provider_reference.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata.0
    }
}

//--------------------------------------    NewTransaction     ---------------------------------------------------------
/// A purchase that has been paid for and now needs to be fulfilled.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub reference: String,
    pub user_id: String,
    pub network: Network,
    pub data_amount: String,
    pub recipient_phone: String,
    pub status: TransactionStatus,
    pub metadata: Metadata,
}

impl NewTransaction {
    pub fn new<S: Into<String>>(
        reference: S,
        user_id: S,
        network: Network,
        data_amount: S,
        recipient_phone: S,
    ) -> Self {
        Self {
            reference: reference.into(),
            user_id: user_id.into(),
            network,
            data_amount: data_amount.into(),
            recipient_phone: recipient_phone.into(),
            status: TransactionStatus::Processing,
            metadata: Metadata::new(),
        }
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

//--------------------------------------   TransactionUpdate   ---------------------------------------------------------
/// A partial update to a transaction. Fields left as `None` are not touched.
///
/// `metadata` entries are merged into the stored map: keys present here overwrite the stored value, all other stored
/// keys are kept.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub status: Option<TransactionStatus>,
    pub provider_order_id: Option<String>,
    pub provider_reference: Option<String>,
    pub retries: Option<i64>,
    /// `Some(None)` clears the stored error
    pub last_error: Option<Option<String>>,
    pub metadata: Metadata,
}

impl TransactionUpdate {
    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_provider_order_id<S: Into<String>>(mut self, id: S) -> Self {
        self.provider_order_id = Some(id.into());
        self
    }

    pub fn with_provider_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.provider_reference = Some(reference.into());
        self
    }

    pub fn with_retries(mut self, retries: i64) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_last_error<S: Into<String>>(mut self, error: S) -> Self {
        self.last_error = Some(Some(error.into()));
        self
    }

    pub fn clear_last_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() &&
            self.provider_order_id.is_none() &&
            self.provider_reference.is_none() &&
            self.retries.is_none() &&
            self.last_error.is_none() &&
            self.metadata.is_empty()
    }
}

/// Shallow-merges `update` into `existing`. Keys in `update` win.
pub fn merge_metadata(existing: &mut Metadata, update: &Metadata) {
    for (key, value) in update {
        existing.insert(key.clone(), value.clone());
    }
}

//--------------------------------------     Notification      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Error => write!(f, "error"),
            NotificationKind::Info => write!(f, "info"),
        }
    }
}

/// A notification as stored once it has been delivered.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      ActivityLog      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLog {
    pub id: i64,
    pub log_type: String,
    pub level: LogLevel,
    pub action: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
