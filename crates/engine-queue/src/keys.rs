//! Key name builders for per-order queue scopes.

use uuid::Uuid;

/// Root of all keys belonging to one order.
pub fn scope_prefix(prefix: &str, order_id: &Uuid) -> String {
    format!("{}:{}", prefix, order_id)
}

/// Glob matching every key in an order scope, for teardown deletion.
pub fn scope_pattern(prefix: &str, order_id: &Uuid) -> String {
    format!("{}:{}:*", prefix, order_id)
}

/// Per-status event queue, e.g. `swap:<id>:status/CONFIRMED`.
pub fn status_queue(prefix: &str, order_id: &Uuid, segment: &str) -> String {
    format!("{}:{}:status/{}", prefix, order_id, segment)
}

/// Per-order execution queue.
pub fn execute_queue(prefix: &str, order_id: &Uuid) -> String {
    format!("{}:{}:execute", prefix, order_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            status_queue("swap", &id, "FAILED"),
            "swap:00000000-0000-0000-0000-000000000000:status/FAILED"
        );
        assert_eq!(
            execute_queue("swap", &id),
            "swap:00000000-0000-0000-0000-000000000000:execute"
        );
        assert!(status_queue("swap", &id, "PENDING").starts_with(&scope_prefix("swap", &id)));
    }

    #[test]
    fn test_scope_pattern_covers_queues() {
        let id = Uuid::new_v4();
        let pattern = scope_pattern("swap", &id);
        let stripped = pattern.strip_suffix('*').unwrap();
        assert!(status_queue("swap", &id, "ROUTING").starts_with(stripped));
        assert!(execute_queue("swap", &id).starts_with(stripped));
    }
}
