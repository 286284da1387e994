use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ServiceEndpoint, TransportConfig};
use crate::error::{PushError, Result};
use crate::infrastructure::transport::{tls, HttpTransport, ReqwestTransport, TlsSocket};
use crate::notification::Notification;
use crate::provider::Provider;
use crate::service::apns::{ApnsFeedbackClient, ApnsServiceClient};
use crate::service::gcm::GcmServiceClient;
use crate::service::mpns::MpnsServiceClient;
use crate::service::{CredentialSource, Credentials, ProviderResponse};

/// Transport adapter for one provider.
#[async_trait]
pub trait ServiceClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Whether the client can still be used. Dead clients are recreated.
    fn is_alive(&self) -> bool;

    async fn send_request(&self, notification: &Notification) -> Result<ProviderResponse>;

    /// Read the provider's stale-token stream.
    async fn receive_feedback(&self) -> Result<ProviderResponse> {
        Err(PushError::Domain(format!(
            "{} does not provide a feedback service",
            self.provider()
        )))
    }
}

pub trait ServiceClientFactory: Send + Sync {
    /// Create a client for pushes, or for the feedback service when `feedback` is set.
    fn create_service_client(&self, provider: Provider, feedback: bool) -> Result<Arc<dyn ServiceClient>>;
}

/// Builds TLS socket clients for APNS and `reqwest` clients for HTTP providers,
/// with credentials and endpoints from a [`CredentialSource`].
pub struct DefaultServiceClientFactory {
    source: Arc<dyn CredentialSource>,
    transport: TransportConfig,
}

impl DefaultServiceClientFactory {
    pub fn new(source: Arc<dyn CredentialSource>, transport: TransportConfig) -> Self {
        Self { source, transport }
    }

    fn tls_socket(&self, endpoint: ServiceEndpoint, credentials: &Credentials) -> Result<TlsSocket> {
        let (host, port) = match endpoint {
            ServiceEndpoint::Socket { host, port } => (host, port),
            other => {
                return Err(PushError::configuration(format!(
                    "Socket endpoint expected, got '{}'",
                    other
                )))
            }
        };
        let tls = tls::client_config(credentials, self.transport.verify_peer)?;
        Ok(TlsSocket::new(
            host,
            port,
            tls,
            self.transport.connect_timeout(),
            self.transport.response_read_timeout(),
        ))
    }

    fn http_transport(&self, credentials: &Credentials) -> Result<Arc<dyn HttpTransport>> {
        Ok(Arc::new(ReqwestTransport::new(
            credentials,
            self.transport.verify_peer,
            self.transport.connect_timeout(),
            self.transport.request_timeout(),
        )?))
    }
}

fn url(endpoint: ServiceEndpoint) -> Result<String> {
    match endpoint {
        ServiceEndpoint::Url(url) => Ok(url),
        other => Err(PushError::configuration(format!(
            "URL endpoint expected, got '{}'",
            other
        ))),
    }
}

impl ServiceClientFactory for DefaultServiceClientFactory {
    fn create_service_client(&self, provider: Provider, feedback: bool) -> Result<Arc<dyn ServiceClient>> {
        if feedback && !provider.has_feedback() {
            return Err(PushError::Domain(format!(
                "{} does not provide a feedback service",
                provider
            )));
        }

        let credentials = self.source.credentials_by_service(provider)?;
        let endpoint = self.source.service_url(provider, feedback)?;

        tracing::info!(
            provider = %provider,
            feedback,
            endpoint = %endpoint,
            authenticated = credentials.is_authenticated(),
            "Creating service client"
        );

        let attempts = self.transport.reconnect_attempts;
        let client: Arc<dyn ServiceClient> = match provider {
            Provider::Apns if feedback => Arc::new(ApnsFeedbackClient::new(
                self.tls_socket(endpoint, &credentials)?,
                attempts,
            )),
            Provider::Apns => Arc::new(ApnsServiceClient::new(
                self.tls_socket(endpoint, &credentials)?,
                attempts,
            )),
            Provider::Gcm => Arc::new(GcmServiceClient::new(
                self.http_transport(&credentials)?,
                url(endpoint)?,
                &credentials,
            )?),
            Provider::Mpns => Arc::new(MpnsServiceClient::new(
                self.http_transport(&credentials)?,
                url(endpoint)?,
            )),
        };
        Ok(client)
    }
}
