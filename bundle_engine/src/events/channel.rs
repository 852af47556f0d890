//! A minimal pub-sub channel for engine events.
//!
//! Each [`EventHandler`] owns a bounded mpsc queue and a single async callback. Any number of [`EventProducer`]s can
//! feed it. Every event is handled on its own task, so a slow callback never holds up the producer beyond the time
//! it takes to enqueue.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use log::*;
use tokio::sync::mpsc;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size.max(1));
        Self { listener, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight callbacks to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Event handler started");
        // Only producers may keep the channel open
        drop(self.sender);
        let in_flight = Arc::new(AtomicUsize::new(0));
        while let Some(ev) = self.listener.recv().await {
            let handler = Arc::clone(&self.handler);
            let counter = Arc::clone(&in_flight);
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                (handler)(ev).await;
                counter.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while in_flight.load(Ordering::SeqCst) > 0 {
            trace!("📬️ Waiting for {} event callbacks to complete", in_flight.load(Ordering::SeqCst));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        debug!("📬️ All producers are gone. Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event. If the handler has gone away the event is dropped and an error is logged.
    pub async fn publish_event(&self, event: E) {
        if self.sender.send(event).await.is_err() {
            error!("📬️ Event handler is no longer running. Event dropped");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use super::*;
    use crate::{db_types::NotificationKind, events::NotificationEvent};

    #[tokio::test]
    async fn every_published_event_is_handled() {
        let _ = env_logger::try_init();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&seen);
        let handler: Handler<NotificationEvent> = Arc::new(move |ev| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                if let Ok(mut seen) = sink.lock() {
                    seen.push(ev.title);
                }
            })
        });
        let event_handler = EventHandler::new(1, handler);
        let p1 = event_handler.subscribe();
        let p2 = event_handler.subscribe();
        tokio::spawn(async move {
            for i in 0..3 {
                let title = format!("a{i}");
                p1.publish_event(NotificationEvent::new("u1", title.as_str(), "m", NotificationKind::Info)).await;
            }
        });
        tokio::spawn(async move {
            for i in 0..3 {
                let title = format!("b{i}");
                p2.publish_event(NotificationEvent::new("u2", title.as_str(), "m", NotificationKind::Info)).await;
            }
        });
        event_handler.start_handler().await;
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["a0", "a1", "a2", "b0", "b1", "b2"]);
    }
}
