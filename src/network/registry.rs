//! Subscriber Registry
//!
//! Tracks the viewers currently connected and delivers payloads to them.
//! Each subscriber is a bounded channel drained by its own connection task,
//! so delivery never waits on a slow socket.

use std::collections::BTreeMap;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::network::protocol::Payload;

/// Unique subscriber identifier.
pub type SubscriberId = Uuid;

/// A registered viewer.
#[derive(Debug)]
pub struct Subscriber {
    /// Subscriber identifier.
    pub id: SubscriberId,
    /// Channel to this subscriber's connection task.
    pub sender: mpsc::Sender<Payload>,
    /// Payloads dropped because the channel was full.
    pub lagged: u64,
}

/// Per-subscriber delivery failure. Never aborts a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Subscriber's buffer is full; this payload was skipped.
    #[error("Subscriber {0} is lagging, payload dropped")]
    Lagging(SubscriberId),

    /// Subscriber's connection task has gone away.
    #[error("Subscriber {0} disconnected")]
    Disconnected(SubscriberId),
}

/// Result of one fan-out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that accepted the payload.
    pub delivered: usize,
    /// Failures, one per affected subscriber.
    pub failures: Vec<DeliveryError>,
}

impl DeliveryReport {
    /// Ids of subscribers whose channel is closed.
    pub fn disconnected(&self) -> impl Iterator<Item = SubscriberId> + '_ {
        self.failures.iter().filter_map(|f| match f {
            DeliveryError::Disconnected(id) => Some(*id),
            DeliveryError::Lagging(_) => None,
        })
    }
}

/// Active subscribers, safe to mutate while a broadcast is in flight.
pub struct SubscriberRegistry {
    subscribers: RwLock<BTreeMap<SubscriberId, Subscriber>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add a subscriber and return its id.
    pub async fn register(&self, sender: mpsc::Sender<Payload>) -> SubscriberId {
        let id = Uuid::new_v4();
        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(id, Subscriber { id, sender, lagged: 0 });
        id
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub async fn unregister(&self, id: &SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        subscribers.remove(id).is_some()
    }

    /// Whether a subscriber is registered.
    pub async fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers.read().await.contains_key(id)
    }

    /// Number of registered subscribers.
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Whether no subscriber is registered.
    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Queue a payload for a single subscriber.
    pub async fn send_to(&self, id: &SubscriberId, payload: Payload) -> Result<(), DeliveryError> {
        let mut subscribers = self.subscribers.write().await;
        match subscribers.get_mut(id) {
            Some(subscriber) => try_deliver(subscriber, payload),
            None => Err(DeliveryError::Disconnected(*id)),
        }
    }

    /// Queue the same payload for every subscriber.
    ///
    /// Uses `try_send`, so the call never waits on a subscriber. The write
    /// lock is held for the whole fan-out so registration cannot interleave.
    pub async fn broadcast(&self, payload: &Payload) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut subscribers = self.subscribers.write().await;

        for subscriber in subscribers.values_mut() {
            match try_deliver(subscriber, payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => report.failures.push(e),
            }
        }

        report
    }

    /// Drop subscribers whose channel is closed. Returns how many were removed.
    pub async fn prune_closed(&self) -> usize {
        let mut subscribers = self.subscribers.write().await;
        let before = subscribers.len();
        subscribers.retain(|id, s| {
            let open = !s.sender.is_closed();
            if !open {
                debug!("Pruning closed subscriber {}", id);
            }
            open
        });
        before - subscribers.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn try_deliver(subscriber: &mut Subscriber, payload: Payload) -> Result<(), DeliveryError> {
    match subscriber.sender.try_send(payload) {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(_)) => {
            subscriber.lagged += 1;
            if subscriber.lagged.is_power_of_two() {
                warn!(
                    "Subscriber {} lagging ({} payloads dropped)",
                    subscriber.id, subscriber.lagged
                );
            }
            Err(DeliveryError::Lagging(subscriber.id))
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            Err(DeliveryError::Disconnected(subscriber.id))
        }
    }
}
