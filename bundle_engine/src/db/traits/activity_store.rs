use crate::{
    db_types::{ActivityLog, Notification},
    events::{ActivityLogEvent, NotificationEvent},
};

/// Keeps a record of delivered notifications and activity-log entries.
#[allow(async_fn_in_trait)]
pub trait ActivityStore {
    type Error: std::error::Error;

    async fn save_notification(&self, notification: &NotificationEvent) -> Result<i64, Self::Error>;

    async fn save_activity_log(&self, entry: &ActivityLogEvent) -> Result<i64, Self::Error>;

    /// Most recent first
    async fn fetch_notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>, Self::Error>;

    /// Most recent first, at most `limit` entries
    async fn fetch_activity_logs(&self, limit: i64) -> Result<Vec<ActivityLog>, Self::Error>;
}
