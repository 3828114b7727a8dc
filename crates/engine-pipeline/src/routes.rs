use dashmap::DashMap;
use engine_core::types::OrderStatus;
use engine_queue::JobQueue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

/// Idle deadline for one order scope. Touch pushes the deadline out and
/// wakes the reaper so it re-arms its sleep.
pub struct IdleState {
    deadline: Mutex<Instant>,
    notify: Notify,
    timeout: Duration,
}

impl IdleState {
    pub fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            deadline: Mutex::new(Instant::now() + timeout),
            notify: Notify::new(),
            timeout,
        })
    }

    pub fn touch(&self) {
        *self.deadline.lock() = Instant::now() + self.timeout;
        self.notify.notify_one();
    }

    pub fn deadline(&self) -> Instant {
        *self.deadline.lock()
    }

    pub async fn wait_touch(&self) {
        self.notify.notified().await;
    }
}

pub(crate) struct ScopeRoutes {
    pub queues: HashMap<OrderStatus, JobQueue>,
    pub idle: Arc<IdleState>,
}

/// Lookup table from order id to that order's live status queues.
///
/// The resource manager writes it; the publisher only reads it. This is the
/// narrow seam that keeps the publisher from owning (or even seeing) worker
/// lifecycles.
pub struct RouteTable {
    scopes: DashMap<Uuid, ScopeRoutes>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            scopes: DashMap::new(),
        }
    }

    pub(crate) fn insert(
        &self,
        order_id: Uuid,
        queues: HashMap<OrderStatus, JobQueue>,
        idle: Arc<IdleState>,
    ) {
        self.scopes.insert(order_id, ScopeRoutes { queues, idle });
    }

    pub(crate) fn remove(&self, order_id: Uuid) {
        self.scopes.remove(&order_id);
    }

    pub fn status_queue(&self, order_id: Uuid, status: OrderStatus) -> Option<JobQueue> {
        self.scopes
            .get(&order_id)
            .and_then(|scope| scope.queues.get(&status).cloned())
    }

    /// Reset the scope's idle timer. Returns false when no scope is live.
    pub fn touch(&self, order_id: Uuid) -> bool {
        match self.scopes.get(&order_id) {
            Some(scope) => {
                scope.idle.touch();
                true
            }
            None => false,
        }
    }

    pub fn has_scope(&self, order_id: Uuid) -> bool {
        self.scopes.contains_key(&order_id)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_scope_lookups() {
        let routes = RouteTable::new();
        let id = Uuid::new_v4();
        assert!(!routes.has_scope(id));
        assert!(routes.status_queue(id, OrderStatus::Confirmed).is_none());
        assert!(!routes.touch(id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_extends_deadline() {
        let idle = IdleState::new(Duration::from_secs(60));
        let first = idle.deadline();

        tokio::time::advance(Duration::from_secs(30)).await;
        idle.touch();
        assert!(idle.deadline() > first);
    }
}
