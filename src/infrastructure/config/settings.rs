use std::collections::HashMap;
use std::env;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use super::services::{CredentialsConfig, ServicesConfig};
use crate::provider::Provider;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub services: ServicesConfig,
    /// Credential records keyed by application name
    #[serde(default)]
    pub applications: HashMap<String, ApplicationConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Application whose credentials are used by default
    #[serde(default = "default_application")]
    pub application: String,
    /// Use sandbox/development endpoints
    #[serde(default)]
    pub development_mode: bool,
}

fn default_application() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long the binary socket waits for an error packet after a write
    #[serde(default = "default_response_read_timeout_ms")]
    pub response_read_timeout_ms: u64,
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Verify provider TLS certificates
    #[serde(default = "default_verify_peer")]
    pub verify_peer: bool,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_response_read_timeout_ms() -> u64 {
    50
}

fn default_reconnect_attempts() -> u32 {
    3
}

fn default_verify_peer() -> bool {
    true
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn response_read_timeout(&self) -> Duration {
        Duration::from_millis(self.response_read_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Credentials of one application, per provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationConfig {
    pub apns: Option<CredentialsConfig>,
    pub gcm: Option<CredentialsConfig>,
    pub mpns: Option<CredentialsConfig>,
}

impl ApplicationConfig {
    pub fn credentials(&self, provider: Provider) -> Option<&CredentialsConfig> {
        match provider {
            Provider::Apns => self.apns.as_ref(),
            Provider::Gcm => self.gcm.as_ref(),
            Provider::Mpns => self.mpns.as_ref(),
        }
    }
}

impl Settings {
    /// Load settings from `.env`, `config/default`, `config/{RUN_MODE}` and
    /// `PUSH__`-prefixed environment variables, in increasing precedence.
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // PUSH__TRANSPORT__VERIFY_PEER, PUSH__APPLICATIONS__MYAPP__GCM__AUTH_TOKEN, ...
            .add_source(
                Environment::with_prefix("PUSH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Build settings from an inline TOML document on top of the defaults.
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("dispatcher.application", default_application())?
            .set_default("dispatcher.development_mode", false)?
            .set_default("transport.connect_timeout_ms", default_connect_timeout_ms())?
            .set_default("transport.request_timeout_ms", default_request_timeout_ms())?
            .set_default(
                "transport.response_read_timeout_ms",
                default_response_read_timeout_ms(),
            )?
            .set_default("transport.reconnect_attempts", default_reconnect_attempts())?
            .set_default("transport.verify_peer", default_verify_peer())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", "pretty")?
            .set_default("services.apns.push.production.host", "gateway.push.apple.com")?
            .set_default("services.apns.push.production.port", 2195)?
            .set_default(
                "services.apns.push.development.host",
                "gateway.sandbox.push.apple.com",
            )?
            .set_default("services.apns.push.development.port", 2195)?
            .set_default(
                "services.apns.feedback.production.host",
                "feedback.push.apple.com",
            )?
            .set_default("services.apns.feedback.production.port", 2196)?
            .set_default(
                "services.apns.feedback.development.host",
                "feedback.sandbox.push.apple.com",
            )?
            .set_default("services.apns.feedback.development.port", 2196)?
            .set_default(
                "services.gcm.push.production.url",
                "https://android.googleapis.com/gcm/send",
            )?
            .set_default(
                "services.gcm.push.development.url",
                "https://android.googleapis.com/gcm/send",
            )?
            .set_default(
                "services.mpns.push.production.url",
                "http://sn1.notify.live.net/throttledthirdparty/01.00/[TOKEN]",
            )?
            .set_default(
                "services.mpns.push.development.url",
                "http://sn1.notify.live.net/throttledthirdparty/01.00/[TOKEN]",
            )
    }

    /// Credential record of an application for a provider.
    pub fn application_credentials(
        &self,
        application: &str,
        provider: Provider,
    ) -> Option<&CredentialsConfig> {
        self.application(application)
            .and_then(|app| app.credentials(provider))
    }

    /// Application record by name. Configuration sources may lowercase keys,
    /// so names compare case-insensitively.
    pub fn application(&self, name: &str) -> Option<&ApplicationConfig> {
        self.applications.get(name).or_else(|| {
            self.applications
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, app)| app)
        })
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            application: default_application(),
            development_mode: false,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            response_read_timeout_ms: default_response_read_timeout_ms(),
            reconnect_attempts: default_reconnect_attempts(),
            verify_peer: default_verify_peer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
