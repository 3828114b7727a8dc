use metrics::{describe_gauge, gauge};

/// Initialize gauge descriptions
pub fn init() {
    describe_gauge!(
        "engine_subscriber_channels",
        "Currently open push channels"
    );
    describe_gauge!(
        "engine_resource_scopes",
        "Live per-order resource scopes"
    );
}

pub fn subscriber_opened() {
    gauge!("engine_subscriber_channels").increment(1.0);
}

pub fn subscriber_closed() {
    gauge!("engine_subscriber_channels").decrement(1.0);
}

pub fn scope_opened() {
    gauge!("engine_resource_scopes").increment(1.0);
}

pub fn scope_closed() {
    gauge!("engine_resource_scopes").decrement(1.0);
}
