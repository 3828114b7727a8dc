mod registry;

pub use registry::{PushRegistry, SubscriberId};
