use dashmap::DashMap;
use engine_core::types::WireFrame;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

pub type SubscriberId = u64;

struct SubscriberEntry {
    order_id: Uuid,
    sender: mpsc::Sender<String>,
}

/// Maps order ids to their live subscriber channels.
///
/// Each subscriber owns a bounded mpsc receiver whose transport side (the
/// socket task) forwards frames to the wire. A channel that is closed or
/// full is treated as dead and garbage-collected on the next send.
pub struct PushRegistry {
    subscribers: DashMap<SubscriberId, SubscriberEntry>,
    by_order: DashMap<Uuid, HashSet<SubscriberId>>,
    next_id: AtomicU64,
    channel_capacity: usize,
}

impl PushRegistry {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            by_order: DashMap::new(),
            next_id: AtomicU64::new(1),
            channel_capacity,
        }
    }

    /// Attach a new subscriber to an order. The returned receiver yields
    /// serialized frames in emit order.
    pub fn register(&self, order_id: Uuid) -> (SubscriberId, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.channel_capacity);

        self.subscribers
            .insert(id, SubscriberEntry { order_id, sender });
        self.by_order.entry(order_id).or_default().insert(id);

        engine_metrics::gauges::subscriber_opened();
        debug!(order_id = %order_id, subscriber = id, "Subscriber registered");
        (id, receiver)
    }

    /// Detach a subscriber. Safe to call twice; returns whether the
    /// subscriber was still present.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let Some((_, entry)) = self.subscribers.remove(&id) else {
            return false;
        };

        if let Some(mut set) = self.by_order.get_mut(&entry.order_id) {
            set.remove(&id);
            if set.is_empty() {
                drop(set);
                self.by_order
                    .remove_if(&entry.order_id, |_, set| set.is_empty());
            }
        }

        engine_metrics::gauges::subscriber_closed();
        debug!(order_id = %entry.order_id, subscriber = id, "Subscriber unregistered");
        true
    }

    /// Detach every subscriber of an order (resource teardown). Dropping
    /// the senders closes the channels, which ends the socket tasks.
    pub fn close_order(&self, order_id: Uuid) -> usize {
        let ids: Vec<SubscriberId> = self
            .by_order
            .get(&order_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        let mut closed = 0;
        for id in ids {
            if self.unregister(id) {
                closed += 1;
            }
        }
        closed
    }

    /// Serialize `frame` once and fan it out to every subscriber of the
    /// order. Dead channels are unregistered and counted as misses.
    /// Returns the number of successful deliveries.
    pub fn emit(&self, order_id: Uuid, frame: &WireFrame) -> usize {
        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Failed to serialize frame");
                return 0;
            }
        };

        // Snapshot ids outside the shard guard: send failures mutate the map.
        let ids: Vec<SubscriberId> = self
            .by_order
            .get(&order_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        if ids.is_empty() {
            debug!(order_id = %order_id, "No subscribers for emit");
            return 0;
        }

        let mut delivered = 0;
        let mut dead = Vec::new();
        for id in ids {
            let ok = self
                .subscribers
                .get(&id)
                .map(|entry| entry.sender.try_send(json.clone()).is_ok())
                .unwrap_or(false);
            if ok {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        for id in dead {
            warn!(order_id = %order_id, subscriber = id, "Channel not writable, unregistering");
            self.unregister(id);
        }

        engine_metrics::counters::frames_delivered(delivered as u64);
        delivered
    }

    /// Push one frame to a single subscriber (used for the deferred
    /// snapshot and pong replies).
    pub fn send_to(&self, id: SubscriberId, frame: &WireFrame) -> bool {
        let json = match serde_json::to_string(frame) {
            Ok(json) => json,
            Err(e) => {
                warn!(subscriber = id, error = %e, "Failed to serialize frame");
                return false;
            }
        };

        let ok = self
            .subscribers
            .get(&id)
            .map(|entry| entry.sender.try_send(json).is_ok())
            .unwrap_or(false);

        if !ok {
            self.unregister(id);
        }
        ok
    }

    pub fn subscriber_count(&self, order_id: Uuid) -> usize {
        self.by_order.get(&order_id).map(|s| s.len()).unwrap_or(0)
    }
}
