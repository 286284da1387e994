//! Infrastructure layer modules
//!
//! This module contains shared infrastructure components:
//! - `config`: Settings, endpoints and credential records
//! - `error`: Unified error types
//! - `metrics`: Prometheus metrics helpers
//! - `transport`: TLS sockets, HTTP client and reconnect backoff

pub mod config;
pub mod error;
pub mod metrics;
pub mod transport;
