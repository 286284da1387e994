//! Apple Push Notification service: binary gateway and feedback service.

mod client;
mod feedback;
mod response;

pub use client::{ApnsFeedbackClient, ApnsServiceClient};
pub use feedback::{parse_feedback_tuples, FeedbackTuple};

pub(crate) use feedback::parse_feedback;
pub(crate) use response::parse_error_packet;
