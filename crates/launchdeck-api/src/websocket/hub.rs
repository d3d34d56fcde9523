//! Subscriber set and best-effort fan-out.

use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error};
use uuid::Uuid;

use super::message::Event;

const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A registered subscriber: its id and the queue its socket drains.
pub struct Subscription {
    pub id: String,
    pub receiver: mpsc::Receiver<Utf8Bytes>,
}

/// Open push connections.
///
/// Delivery is at-most-once. A subscriber whose queue is full misses the
/// event; one whose queue is closed is dropped from the set.
pub struct BroadcastHub {
    subscribers: DashMap<String, mpsc::Sender<Utf8Bytes>>,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    /// Hub whose subscribers each buffer at most `capacity` frames.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = Uuid::new_v4().to_string();
        let (tx, receiver) = mpsc::channel(self.capacity);
        self.subscribers.insert(id.clone(), tx);
        debug!("Subscriber added: {} ({} open)", id, self.subscribers.len());
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: &str) {
        if self.subscribers.remove(id).is_some() {
            debug!("Subscriber removed: {} ({} open)", id, self.subscribers.len());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Serialize `event` once and offer it to every subscriber.
    ///
    /// Returns how many subscribers accepted it.
    pub fn broadcast(&self, event: &Event) -> usize {
        let Some(frame) = encode(event) else {
            return 0;
        };

        // Snapshot so subscribe/unsubscribe never contend with delivery.
        let targets: Vec<(String, mpsc::Sender<Utf8Bytes>)> = self
            .subscribers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, sender) in targets {
            match sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!("Subscriber {} is behind, skipping event", id);
                }
                Err(TrySendError::Closed(_)) => self.unsubscribe(&id),
            }
        }
        delivered
    }

    /// Queue a message for one subscriber.
    pub fn send_to<T: Serialize>(&self, id: &str, message: &T) -> bool {
        let Some(frame) = encode(message) else {
            return false;
        };
        match self.subscribers.get(id) {
            Some(sender) => sender.try_send(frame).is_ok(),
            None => false,
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

fn encode<T: Serialize>(message: &T) -> Option<Utf8Bytes> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Utf8Bytes::from(json)),
        Err(e) => {
            error!("Failed to serialize push message: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::WsMessage;

    fn reloaded(label: &str) -> Event {
        Event::LaunchAgentReloaded {
            label: label.to_string(),
        }
    }

    #[test]
    fn test_hub_new() {
        let hub = BroadcastHub::new();
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.broadcast(&reloaded("com.lman.x")), 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let hub = BroadcastHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        assert_eq!(hub.broadcast(&reloaded("com.lman.x")), 2);

        let frame_a = a.receiver.recv().await.unwrap();
        let frame_b = b.receiver.recv().await.unwrap();
        assert_eq!(frame_a.as_str(), frame_b.as_str());

        let json: serde_json::Value = serde_json::from_str(frame_a.as_str()).unwrap();
        assert_eq!(json["type"], "launchagent-reloaded");
        assert_eq!(json["label"], "com.lman.x");
    }

    #[tokio::test]
    async fn test_closed_subscriber_is_pruned() {
        let hub = BroadcastHub::new();
        let mut open = hub.subscribe();
        let closed = hub.subscribe();
        drop(closed.receiver);

        assert_eq!(hub.broadcast(&reloaded("com.lman.x")), 1);
        assert_eq!(hub.subscriber_count(), 1);
        assert!(open.receiver.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_full_subscriber_is_skipped_not_removed() {
        let hub = BroadcastHub::with_capacity(1);
        let mut slow = hub.subscribe();

        assert_eq!(hub.broadcast(&reloaded("first")), 1);
        assert_eq!(hub.broadcast(&reloaded("second")), 0);
        assert_eq!(hub.subscriber_count(), 1);

        let frame = slow.receiver.recv().await.unwrap();
        assert!(frame.as_str().contains("first"));
        assert_eq!(hub.broadcast(&reloaded("third")), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let hub = BroadcastHub::new();
        let sub = hub.subscribe();
        hub.unsubscribe(&sub.id);
        hub.unsubscribe("never-existed");
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_send_to() {
        let hub = BroadcastHub::new();
        let mut sub = hub.subscribe();

        assert!(hub.send_to(&sub.id, &WsMessage::Pong { timestamp: 7 }));
        assert!(!hub.send_to("missing", &WsMessage::Pong { timestamp: 7 }));

        let frame = sub.receiver.recv().await.unwrap();
        assert_eq!(frame.as_str(), r#"{"type":"pong","timestamp":7}"#);
    }
}
