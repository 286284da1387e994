//! Provider service clients and response handling.
//!
//! Clients send built notifications and return raw [`ProviderResponse`]s;
//! the [`ResponseHandler`] parses them into [`ResponseOutcome`]s and keeps
//! the aggregated invalid recipients and message errors.

pub mod apns;
mod application;
mod client;
mod credentials;
pub mod gcm;
mod handler;
pub mod mpns;
mod response;

pub use application::{Application, CredentialSource};
pub use client::{DefaultServiceClientFactory, ServiceClient, ServiceClientFactory};
pub use credentials::Credentials;
pub use handler::ResponseHandler;
pub use response::{ProviderResponse, ResponseOutcome};
