use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{PushError, Result};
use crate::infrastructure::transport::HttpTransport;
use crate::notification::Notification;
use crate::provider::Provider;
use crate::service::{ProviderResponse, ServiceClient};

/// Placeholder replaced by the channel token in the service URL.
const TOKEN_PLACEHOLDER: &str = "[TOKEN]";

/// Posts XML payloads to a device's notification channel.
pub struct MpnsServiceClient {
    transport: Arc<dyn HttpTransport>,
    url_template: String,
}

impl MpnsServiceClient {
    pub fn new(transport: Arc<dyn HttpTransport>, url_template: impl Into<String>) -> Self {
        Self {
            transport,
            url_template: url_template.into(),
        }
    }

    fn channel_url(&self, token: &str) -> String {
        self.url_template
            .replace(TOKEN_PLACEHOLDER, &urlencoding::encode(token))
    }
}

#[async_trait]
impl ServiceClient for MpnsServiceClient {
    fn provider(&self) -> Provider {
        Provider::Mpns
    }

    fn is_alive(&self) -> bool {
        true
    }

    async fn send_request(&self, notification: &Notification) -> Result<ProviderResponse> {
        let recipient = notification.recipients().first().ok_or_else(|| {
            PushError::Client(format!(
                "Notification {} has no recipient",
                notification.id()
            ))
        })?;

        let custom = |key: &str| notification.custom_value(key).unwrap_or_default().to_string();
        let headers = [
            ("Accept", "application/*".to_string()),
            ("Content-Type", "text/xml".to_string()),
            ("X-MessageID", custom("message_id")),
            ("X-NotificationClass", custom("delay_interval")),
            ("X-WindowsPhone-Target", custom("message_type")),
        ];

        let url = self.channel_url(recipient.identifier());
        let response = self
            .transport
            .post(&url, &headers, notification.payload().clone())
            .await?;

        Ok(ProviderResponse::Mpns {
            status: response.status,
            recipients: notification.recipients().to_vec(),
        })
    }
}
