//! Microsoft Push Notification Service: XML over HTTP.

mod client;
mod response;

pub use client::MpnsServiceClient;

pub(crate) use response::parse_response;
