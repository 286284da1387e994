//! Unified push notification dispatch for APNS, GCM and MPNS.
//!
//! A [`Message`] carries provider-specific content and a list of recipients.
//! The [`NotificationBuilder`] splits it into provider-sized batches with
//! encoded payloads, the [`Dispatcher`] sends each batch over a pooled
//! service client, and the [`ResponseHandler`] folds provider answers into
//! invalid-recipient and per-message error reports.

// Infrastructure layer (shared components)
pub mod infrastructure;

// Re-export infrastructure modules for shorter paths
pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;

// Domain layer
pub mod message;
pub mod notification;
pub mod provider;
pub mod service;

// Application layer
pub mod dispatcher;

// Supporting modules
pub mod telemetry;

pub use config::Settings;
pub use dispatcher::{DispatchReport, Dispatcher, DispatcherStatsSnapshot};
pub use error::{PushError, Result};
pub use message::{Message, MessageCollection, RecipientDevice};
pub use notification::{Notification, NotificationBuilder};
pub use provider::Provider;
pub use service::{ResponseHandler, ResponseOutcome};
