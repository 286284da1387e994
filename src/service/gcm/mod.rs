//! Google Cloud Messaging: JSON over HTTP.

mod client;
mod response;

pub use client::GcmServiceClient;

pub(crate) use response::parse_response;
