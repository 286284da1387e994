//! Notification building: batching, payload construction and wire packing.

mod builder;
pub mod payload;
mod types;
pub mod xml;

pub use builder::{NotificationBatches, NotificationBuilder};
pub use payload::{Payload, PayloadHandler};
pub use types::Notification;
