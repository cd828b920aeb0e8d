//! src/eventbus/mod.rs
//!
//! Provides an in-process event bus that supports guaranteed delivery
//! to multiple subscribers via bounded MPSC queues.

pub mod escalation_logger;

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::BlacklistEntry;

/// Notifications emitted by the blacklist tracker.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// An author just crossed the threshold for this owner. Emitted once per
    /// `Normal -> Blacklisted` transition, never on later increments.
    AuthorBlacklisted {
        owner_id: Uuid,
        entry: BlacklistEntry,
        timestamp: DateTime<Utc>,
    },

    /// The owner removed one author from the blacklist.
    AuthorUnblacklisted {
        owner_id: Uuid,
        entry_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// The owner cleared their blacklist; `cleared` entries changed.
    BlacklistCleared {
        owner_id: Uuid,
        cleared: u64,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            TrackerEvent::AuthorBlacklisted { .. } => "author.blacklisted",
            TrackerEvent::AuthorUnblacklisted { .. } => "author.unblacklisted",
            TrackerEvent::BlacklistCleared { .. } => "blacklist.cleared",
        }
    }

    pub fn owner_id(&self) -> Uuid {
        match self {
            TrackerEvent::AuthorBlacklisted { owner_id, .. }
            | TrackerEvent::AuthorUnblacklisted { owner_id, .. }
            | TrackerEvent::BlacklistCleared { owner_id, .. } => *owner_id,
        }
    }
}

/// Each subscriber gets its own `mpsc::Sender<TrackerEvent>` for guaranteed delivery.
///
/// - If the subscriber’s channel buffer fills, `publish` will await
///   until there's space (backpressure).
/// - If the subscriber has dropped the `Receiver`, its sender is pruned on the
///   next publish.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<TrackerEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber’s buffer.
const DEFAULT_BUFFER_SIZE: usize = 1024;

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new, empty event bus.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<TrackerEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Publish an event to all subscribers.
    pub async fn publish(&self, event: TrackerEvent) {
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        let mut closed = false;
        for s in senders {
            if s.send(event.clone()).await.is_err() {
                closed = true;
            }
        }
        if closed {
            let mut subs = self.subscribers.lock().await;
            subs.retain(|s| !s.is_closed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout, Duration};

    fn cleared(owner_id: Uuid, n: u64) -> TrackerEvent {
        TrackerEvent::BlacklistCleared { owner_id, cleared: n, timestamp: Utc::now() }
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();
        let owner = Uuid::new_v4();

        let mut rx1 = bus.subscribe(Some(5)).await;
        let mut rx2 = bus.subscribe(Some(5)).await;

        bus.publish(cleared(owner, 2)).await;

        let evt1 = rx1.recv().await.expect("rx1 should get event");
        let evt2 = rx2.recv().await.expect("rx2 should get event");
        assert_eq!(evt1.event_type(), "blacklist.cleared");
        assert_eq!(evt2.owner_id(), owner);
    }

    #[tokio::test]
    async fn test_backpressure_blocking() {
        let bus = EventBus::new();
        let owner = Uuid::new_v4();
        let mut rx = bus.subscribe(Some(1)).await; // queue size = 1

        bus.publish(cleared(owner, 1)).await;

        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            let first = rx.recv().await.expect("expected first message");
            let second = rx.recv().await.expect("expected second message");
            (first, second)
        });

        // This call waits until the reader makes room.
        let second_publish = bus.publish(cleared(owner, 2));
        let result = timeout(Duration::from_millis(500), second_publish).await;
        assert!(result.is_ok(), "publish should eventually unblock");

        let (evt1, evt2) = handle.await.unwrap();
        match (evt1, evt2) {
            (
                TrackerEvent::BlacklistCleared { cleared: 1, .. },
                TrackerEvent::BlacklistCleared { cleared: 2, .. },
            ) => {}
            other => panic!("events out of order: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe(Some(1)).await;
        let _keep = bus.subscribe(Some(4)).await;
        drop(rx);

        bus.publish(cleared(Uuid::new_v4(), 0)).await;
        assert_eq!(bus.subscriber_count().await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_flag() {
        let bus = EventBus::new();
        assert!(!bus.is_shutdown());
        bus.shutdown();
        assert!(bus.is_shutdown());
    }
}
