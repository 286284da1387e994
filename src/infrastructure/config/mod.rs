mod services;
mod settings;

pub use services::{
    CredentialsConfig, EndpointConfig, EnvironmentEndpoints, ServiceEndpoint, ServiceEndpoints,
    ServicesConfig,
};
pub use settings::{
    ApplicationConfig, DispatcherConfig, LogFormat, LoggingConfig, Settings, TransportConfig,
};
