use std::collections::HashMap;

use crate::config::{ServiceEndpoint, ServicesConfig, Settings};
use crate::error::{PushError, Result};
use crate::provider::Provider;
use crate::service::Credentials;

/// Narrow view of configuration consumed by service clients.
pub trait CredentialSource: Send + Sync {
    fn credentials_by_service(&self, provider: Provider) -> Result<Credentials>;

    /// Endpoint for pushes, or for the feedback service when `is_feedback` is set.
    fn service_url(&self, provider: Provider, is_feedback: bool) -> Result<ServiceEndpoint>;
}

/// A named application's credentials and the endpoints of its environment.
#[derive(Debug, Clone)]
pub struct Application {
    name: String,
    development_mode: bool,
    credentials: HashMap<Provider, Credentials>,
    services: ServicesConfig,
}

impl Application {
    /// Load and validate an application's credentials.
    pub fn load(settings: &Settings, name: &str) -> Result<Self> {
        let config = settings.application(name).ok_or_else(|| {
            PushError::configuration(format!("Application '{}' is not defined", name))
        })?;

        let mut credentials = HashMap::new();
        for provider in Provider::ALL {
            let record = config.credentials(provider);
            if record.is_none() && provider != Provider::Mpns {
                continue;
            }
            credentials.insert(provider, Credentials::for_provider(provider, record)?);
        }

        tracing::info!(
            application = %name,
            services = ?credentials.keys().collect::<Vec<_>>(),
            development_mode = settings.dispatcher.development_mode,
            "Application credentials loaded"
        );

        Ok(Self {
            name: name.to_string(),
            development_mode: settings.dispatcher.development_mode,
            credentials,
            services: settings.services.clone(),
        })
    }

    /// Load the application named in `dispatcher.application`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::load(settings, &settings.dispatcher.application)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Providers with usable credentials.
    pub fn initialized_services(&self) -> Vec<Provider> {
        let mut services: Vec<Provider> = self.credentials.keys().copied().collect();
        services.sort();
        services
    }
}

impl CredentialSource for Application {
    fn credentials_by_service(&self, provider: Provider) -> Result<Credentials> {
        self.credentials.get(&provider).cloned().ok_or_else(|| {
            PushError::configuration(format!(
                "Credentials for service '{}' were not initialized for application '{}'",
                provider, self.name
            ))
        })
    }

    fn service_url(&self, provider: Provider, is_feedback: bool) -> Result<ServiceEndpoint> {
        self.services
            .endpoint(provider, is_feedback, self.development_mode)
    }
}
