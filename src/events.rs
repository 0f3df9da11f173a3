//! Fan-out of [`api::Event`]s to the currently connected subscribers.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    task::{Context, Poll},
};

use futures::Stream;
use tokio::sync::mpsc;

use crate::api;

/// Registry of live subscribers.
///
/// Delivery is best-effort: events are never stored, so a subscriber only
/// sees what is published while it is registered.
#[derive(Clone, Default)]
pub struct Hub(Arc<Inner>);

#[derive(Default)]
struct Inner {
    subscribers: Mutex<HashMap<u64, mpsc::UnboundedSender<api::Event>>>,
    next_id: AtomicU64,
}

impl Hub {
    pub fn subscribe(&self) -> Subscription {
        let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers().insert(id, tx);
        tracing::debug!(subscriber = id, "subscribed to queue events");

        Subscription {
            id,
            hub: self.clone(),
            rx,
        }
    }

    /// Sends the event to every subscriber, dropping the ones that went away.
    pub fn publish(&self, event: api::Event) {
        self.subscribers().retain(|id, tx| {
            let delivered = tx.send(event.clone()).is_ok();
            if !delivered {
                tracing::debug!(subscriber = id, "dropped closed subscriber");
            }
            delivered
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers().len()
    }

    fn unsubscribe(&self, id: u64) {
        if self.subscribers().remove(&id).is_some() {
            tracing::debug!(subscriber = id, "unsubscribed from queue events");
        }
    }

    fn subscribers(
        &self,
    ) -> MutexGuard<'_, HashMap<u64, mpsc::UnboundedSender<api::Event>>> {
        self.0
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stream of events published after subscribing. Dropping it unregisters
/// the subscriber.
pub struct Subscription {
    id: u64,
    hub: Hub,
    rx: mpsc::UnboundedReceiver<api::Event>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<api::Event> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = api::Event;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display_event() -> api::Event {
        api::Event::DisplayUpdated(Vec::new())
    }

    #[tokio::test]
    async fn delivers_to_every_subscriber_in_order() {
        let hub = Hub::default();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(display_event());
        hub.publish(api::Event::DisplayUpdated(vec![api::display::Row {
            service: api::ticket::Service::S2,
            now_serving: api::display::NowServing::default(),
            next: Some("S2-001".into()),
        }]));

        for sub in [&mut a, &mut b] {
            let Some(api::Event::DisplayUpdated(first)) = sub.recv().await
            else {
                panic!("expected a display update");
            };
            assert!(first.is_empty());
            let Some(api::Event::DisplayUpdated(second)) = sub.recv().await
            else {
                panic!("expected a display update");
            };
            assert_eq!(second.len(), 1);
        }
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let hub = Hub::default();
        hub.publish(display_event());

        let mut late = hub.subscribe();
        hub.publish(api::Event::DisplayUpdated(Vec::new()));
        drop(hub);

        let kind = late.recv().await.map(|e| e.kind());
        assert_eq!(kind, Some("display.updated"));
        assert!(late.rx.try_recv().is_err());
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let hub = Hub::default();
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(a);
        assert_eq!(hub.subscriber_count(), 1);

        hub.publish(display_event());
        drop(b);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
