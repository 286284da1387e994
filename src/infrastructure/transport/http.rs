use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{PushError, Result};
use crate::service::Credentials;

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Minimal POST capability used by HTTP providers.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, url: &str, headers: &[(&str, String)], body: Bytes) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(
        credentials: &Credentials,
        verify_peer: bool,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .danger_accept_invalid_certs(!verify_peer);

        if let Credentials::Certificate { certificate, .. } = credentials {
            let pem = std::fs::read(certificate)?;
            builder = builder.identity(reqwest::Identity::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, url: &str, headers: &[(&str, String)], body: Bytes) -> Result<HttpResponse> {
        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| PushError::invalid_argument(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| PushError::invalid_argument(format!("Invalid header value for '{}': {}", name, e)))?;
            header_map.insert(name, value);
        }

        let response = self.client.post(url).headers(header_map).body(body).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(HttpResponse { status, body })
    }
}
