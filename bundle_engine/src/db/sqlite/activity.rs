use sqlx::SqliteConnection;

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{ActivityLog, Notification},
    events::{ActivityLogEvent, NotificationEvent},
};

pub async fn insert_notification(
    notification: &NotificationEvent,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let id = sqlx::query_scalar(
        "INSERT INTO notifications (user_id, title, message, kind) VALUES ($1, $2, $3, $4) RETURNING id;",
    )
    .bind(&notification.user_id)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.kind)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn insert_activity_log(
    entry: &ActivityLogEvent,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let id = sqlx::query_scalar(
        "INSERT INTO activity_logs (log_type, level, action, message) VALUES ($1, $2, $3, $4) RETURNING id;",
    )
    .bind(&entry.log_type)
    .bind(entry.level)
    .bind(&entry.action)
    .bind(&entry.message)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_notifications_for_user(
    user_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, SqliteDatabaseError> {
    let notifications = sqlx::query_as("SELECT * FROM notifications WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(notifications)
}

pub async fn fetch_activity_logs(
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ActivityLog>, SqliteDatabaseError> {
    let logs =
        sqlx::query_as("SELECT * FROM activity_logs ORDER BY id DESC LIMIT $1").bind(limit).fetch_all(conn).await?;
    Ok(logs)
}
