use metrics::{counter, describe_counter};

/// Initialize counter descriptions
pub fn init() {
    describe_counter!(
        "engine_orders_created_total",
        "Total number of orders accepted"
    );
    describe_counter!(
        "engine_orders_confirmed_total",
        "Total number of orders confirmed"
    );
    describe_counter!(
        "engine_orders_failed_total",
        "Total number of orders that reached failed"
    );
    describe_counter!(
        "engine_events_published_total",
        "Total number of status events enqueued"
    );
    describe_counter!(
        "engine_events_dropped_total",
        "Total number of status events dropped before enqueue"
    );
    describe_counter!(
        "engine_frames_delivered_total",
        "Total number of frames delivered to subscriber channels"
    );
}

pub fn orders_created(count: u64) {
    counter!("engine_orders_created_total").increment(count);
}

pub fn orders_confirmed(count: u64) {
    counter!("engine_orders_confirmed_total").increment(count);
}

pub fn orders_failed(count: u64) {
    counter!("engine_orders_failed_total").increment(count);
}

pub fn events_published(count: u64) {
    counter!("engine_events_published_total").increment(count);
}

/// Dropped before enqueue; `reason` distinguishes missing scopes from
/// substrate errors.
pub fn events_dropped(count: u64, reason: &str) {
    counter!("engine_events_dropped_total", "reason" => reason.to_string()).increment(count);
}

pub fn frames_delivered(count: u64) {
    counter!("engine_frames_delivered_total").increment(count);
}
