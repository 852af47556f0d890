use serde::{Deserialize, Serialize};

use crate::db_types::{LogLevel, NotificationKind, Transaction, TransactionStatus};

/// A message for the customer who owns a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

impl NotificationEvent {
    pub fn new<S: Into<String>>(user_id: S, title: S, message: S, kind: NotificationKind) -> Self {
        Self { user_id: user_id.into(), title: title.into(), message: message.into(), kind }
    }

    /// The notification sent when `tx` reaches a terminal status. Non-terminal transactions get `None`.
    pub fn for_terminal_transaction(tx: &Transaction) -> Option<Self> {
        match tx.status {
            TransactionStatus::Success => Some(Self::new(
                tx.user_id.clone(),
                "Data bundle delivered".to_string(),
                format!("Your {} {} bundle for {} has been delivered.", tx.data_amount, tx.network, tx.recipient_phone),
                NotificationKind::Success,
            )),
            TransactionStatus::Failed => Some(Self::new(
                tx.user_id.clone(),
                "Data bundle purchase failed".to_string(),
                format!(
                    "We could not deliver your {} {} bundle for {} (ref {}). Please contact support.",
                    tx.data_amount, tx.network, tx.recipient_phone, tx.reference
                ),
                NotificationKind::Error,
            )),
            _ => None,
        }
    }
}

/// An entry for the operator-facing activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEvent {
    pub log_type: String,
    pub level: LogLevel,
    pub action: String,
    pub message: String,
}

impl ActivityLogEvent {
    pub const TRANSACTION: &'static str = "transaction";

    pub fn new<S: Into<String>>(log_type: S, level: LogLevel, action: S, message: S) -> Self {
        Self { log_type: log_type.into(), level, action: action.into(), message: message.into() }
    }

    pub fn transaction_failed(tx: &Transaction, reason: &str) -> Self {
        Self::new(
            Self::TRANSACTION.to_string(),
            LogLevel::Error,
            "fulfillment_failed".to_string(),
            format!("Transaction {} (#{}) failed after {} attempt(s). {reason}", tx.reference, tx.id, tx.retries),
        )
    }

    pub fn sync_error(tx: &Transaction, reason: &str) -> Self {
        Self::new(
            Self::TRANSACTION.to_string(),
            LogLevel::Warning,
            "status_sync_error".to_string(),
            format!("Could not sync transaction {} (#{}) with the provider. {reason}", tx.reference, tx.id),
        )
    }
}
