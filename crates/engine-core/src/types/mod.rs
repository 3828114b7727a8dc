mod event;
mod order;
mod quote;

pub use event::{ConnectedFrame, PongFrame, StatusEvent, WireFrame};
pub use order::{DexType, Order, OrderStatus, StatusChange};
pub use quote::{BuiltTx, Quote};
