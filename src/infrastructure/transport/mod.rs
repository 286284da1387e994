//! Transport primitives: persistent TLS sockets and HTTP POST.

pub mod backoff;
mod http;
mod socket;
pub mod tls;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport};
pub use socket::{SocketTransport, TlsSocket};
