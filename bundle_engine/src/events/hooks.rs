use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{ActivityLogEvent, EventHandler, EventProducer, Handler, NotificationEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub notification_producer: Vec<EventProducer<NotificationEvent>>,
    pub activity_log_producer: Vec<EventProducer<ActivityLogEvent>>,
}

impl EventProducers {
    pub async fn publish_notification(&self, event: NotificationEvent) {
        for producer in &self.notification_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_activity_log(&self, event: ActivityLogEvent) {
        for producer in &self.activity_log_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_notification: Option<EventHandler<NotificationEvent>>,
    pub on_activity_log: Option<EventHandler<ActivityLogEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_notification = hooks.on_notification.map(|f| EventHandler::new(buffer_size, f));
        let on_activity_log = hooks.on_activity_log.map(|f| EventHandler::new(buffer_size, f));
        Self { on_notification, on_activity_log }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_notification {
            result.notification_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_activity_log {
            result.activity_log_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_notification {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_activity_log {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_notification: Option<Handler<NotificationEvent>>,
    pub on_activity_log: Option<Handler<ActivityLogEvent>>,
}

impl EventHooks {
    pub fn on_notification<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(NotificationEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_notification = Some(Arc::new(f));
        self
    }

    pub fn on_activity_log<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ActivityLogEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_activity_log = Some(Arc::new(f));
        self
    }
}
