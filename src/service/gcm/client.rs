use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{PushError, Result};
use crate::infrastructure::transport::HttpTransport;
use crate::notification::Notification;
use crate::provider::Provider;
use crate::service::{Credentials, ProviderResponse, ServiceClient};

/// Posts JSON payloads to the GCM HTTP endpoint.
pub struct GcmServiceClient {
    transport: Arc<dyn HttpTransport>,
    url: String,
    auth_token: String,
}

impl GcmServiceClient {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>, credentials: &Credentials) -> Result<Self> {
        let Credentials::AuthToken(auth_token) = credentials else {
            return Err(PushError::configuration("GCM requires an auth token"));
        };
        Ok(Self {
            transport,
            url: url.into(),
            auth_token: auth_token.clone(),
        })
    }
}

#[async_trait]
impl ServiceClient for GcmServiceClient {
    fn provider(&self) -> Provider {
        Provider::Gcm
    }

    fn is_alive(&self) -> bool {
        true
    }

    async fn send_request(&self, notification: &Notification) -> Result<ProviderResponse> {
        let headers = [
            ("Authorization", format!("key={}", self.auth_token)),
            ("Content-Type", "application/json".to_string()),
        ];
        let response = self
            .transport
            .post(&self.url, &headers, notification.payload().clone())
            .await?;

        Ok(ProviderResponse::Gcm {
            status: response.status,
            body: response.body,
            recipients: notification.recipients().to_vec(),
        })
    }
}
