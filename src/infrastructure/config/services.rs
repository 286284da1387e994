use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{PushError, Result};
use crate::provider::Provider;

/// Connection target of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEndpoint {
    /// Binary socket gateway
    Socket { host: String, port: u16 },
    /// HTTP endpoint or URL template
    Url(String),
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceEndpoint::Socket { host, port } => write!(f, "{}:{}", host, port),
            ServiceEndpoint::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentEndpoints {
    #[serde(default)]
    pub production: EndpointConfig,
    #[serde(default)]
    pub development: EndpointConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceEndpoints {
    #[serde(default)]
    pub push: EnvironmentEndpoints,
    pub feedback: Option<EnvironmentEndpoints>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub apns: ServiceEndpoints,
    #[serde(default)]
    pub gcm: ServiceEndpoints,
    #[serde(default)]
    pub mpns: ServiceEndpoints,
}

impl ServicesConfig {
    fn for_provider(&self, provider: Provider) -> &ServiceEndpoints {
        match provider {
            Provider::Apns => &self.apns,
            Provider::Gcm => &self.gcm,
            Provider::Mpns => &self.mpns,
        }
    }

    /// Resolve the endpoint for a provider, request kind and environment.
    pub fn endpoint(
        &self,
        provider: Provider,
        feedback: bool,
        development: bool,
    ) -> Result<ServiceEndpoint> {
        let service = self.for_provider(provider);
        let environments = if feedback {
            service.feedback.as_ref().ok_or_else(|| {
                PushError::configuration(format!(
                    "Feedback service URL for {} is not configured",
                    provider
                ))
            })?
        } else {
            &service.push
        };
        let (environment, config) = if development {
            ("development", &environments.development)
        } else {
            ("production", &environments.production)
        };

        let missing = || {
            PushError::configuration(format!(
                "{} {} endpoint for {} is incomplete",
                environment,
                if feedback { "feedback" } else { "push" },
                provider
            ))
        };

        match provider {
            Provider::Apns => Ok(ServiceEndpoint::Socket {
                host: config.host.clone().filter(|h| !h.is_empty()).ok_or_else(missing)?,
                port: config.port.ok_or_else(missing)?,
            }),
            Provider::Gcm | Provider::Mpns => Ok(ServiceEndpoint::Url(
                config.url.clone().filter(|u| !u.is_empty()).ok_or_else(missing)?,
            )),
        }
    }
}

/// Raw credential record as written in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    /// PEM bundle with the client certificate chain and private key
    pub certificate: Option<PathBuf>,
    pub certificate_pass_phrase: Option<String>,
    pub auth_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_feedback_endpoint() {
        let services = ServicesConfig::default();
        assert!(matches!(
            services.endpoint(Provider::Gcm, true, false),
            Err(PushError::Configuration(_))
        ));
    }

    #[test]
    fn test_incomplete_socket_endpoint() {
        let mut services = ServicesConfig::default();
        services.apns.push.production.host = Some("gateway.example".into());
        assert!(services.endpoint(Provider::Apns, false, false).is_err());

        services.apns.push.production.port = Some(2195);
        assert_eq!(
            services.endpoint(Provider::Apns, false, false).unwrap().to_string(),
            "gateway.example:2195"
        );
    }
}
