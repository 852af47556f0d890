//! Event handlers installed by the server.
//!
//! Every notification and activity-log entry the fulfillment engine publishes is logged and then saved through
//! [`ActivityStore`]. A failure to save is logged and otherwise ignored; the transaction itself has already been
//! updated by the time the event arrives.
use bundle_engine::{
    events::{EventHandlers, EventHooks},
    ActivityStore,
    SqliteDatabase,
};
use log::*;

pub const EVENT_BUFFER_SIZE: usize = 25;

pub fn create_activity_event_handlers(db: SqliteDatabase) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let notification_db = db.clone();
    hooks.on_notification(move |ev| {
        let db = notification_db.clone();
        Box::pin(async move {
            info!("📬️ [{}] {} for {}: {}", ev.kind, ev.title, ev.user_id, ev.message);
            match db.save_notification(&ev).await {
                Ok(id) => trace!("📬️ Notification saved with id {id}"),
                Err(e) => error!("📬️ Could not save notification for {}. {e}", ev.user_id),
            }
        })
    });
    hooks.on_activity_log(move |ev| {
        let db = db.clone();
        Box::pin(async move {
            info!("📬️ [{}] {}/{}: {}", ev.level, ev.log_type, ev.action, ev.message);
            match db.save_activity_log(&ev).await {
                Ok(id) => trace!("📬️ Activity log entry saved with id {id}"),
                Err(e) => error!("📬️ Could not save activity log entry '{}'. {e}", ev.action),
            }
        })
    });
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}
