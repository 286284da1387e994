use std::fmt;
use std::path::PathBuf;

use crate::error::{PushError, Result};
use crate::infrastructure::config::CredentialsConfig;
use crate::provider::Provider;

/// Secret material used to authenticate against a provider.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// PEM bundle with client certificate chain and key
    Certificate {
        certificate: PathBuf,
        passphrase: String,
    },
    AuthToken(String),
    /// Unauthenticated access
    Null,
}

impl Credentials {
    /// Certificate credentials. The file must exist.
    pub fn certificate(certificate: impl Into<PathBuf>, passphrase: impl Into<String>) -> Result<Self> {
        let certificate = certificate.into();
        if !certificate.is_file() {
            return Err(PushError::configuration(format!(
                "Certificate file '{}' does not exist",
                certificate.display()
            )));
        }
        Ok(Credentials::Certificate {
            certificate,
            passphrase: passphrase.into(),
        })
    }

    pub fn auth_token(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(PushError::configuration("Auth token must not be empty"));
        }
        Ok(Credentials::AuthToken(token))
    }

    /// Validate a configured record against what the provider requires.
    pub fn for_provider(provider: Provider, record: Option<&CredentialsConfig>) -> Result<Self> {
        let missing = |field: &str| {
            PushError::configuration(format!("{} credentials require '{}'", provider, field))
        };

        match provider {
            Provider::Apns => {
                let record = record.ok_or_else(|| missing("certificate"))?;
                Self::certificate_from(record, &missing)
            }
            Provider::Gcm => {
                let token = record
                    .and_then(|r| r.auth_token.clone())
                    .ok_or_else(|| missing("auth_token"))?;
                Self::auth_token(token)
            }
            Provider::Mpns => match record {
                Some(record) if record.certificate.is_some() => Self::certificate_from(record, &missing),
                _ => Ok(Credentials::Null),
            },
        }
    }

    fn certificate_from(
        record: &CredentialsConfig,
        missing: &dyn Fn(&str) -> PushError,
    ) -> Result<Self> {
        let certificate = record.certificate.clone().ok_or_else(|| missing("certificate"))?;
        let passphrase = record
            .certificate_pass_phrase
            .clone()
            .ok_or_else(|| missing("certificate_pass_phrase"))?;
        Self::certificate(certificate, passphrase)
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Credentials::Null)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Certificate { certificate, .. } => f
                .debug_struct("Certificate")
                .field("certificate", certificate)
                .field("passphrase", &"***")
                .finish(),
            Credentials::AuthToken(_) => f.debug_tuple("AuthToken").field(&"***").finish(),
            Credentials::Null => f.write_str("Null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(certificate: Option<PathBuf>, pass: Option<&str>, token: Option<&str>) -> CredentialsConfig {
        CredentialsConfig {
            certificate,
            certificate_pass_phrase: pass.map(String::from),
            auth_token: token.map(String::from),
        }
    }

    #[test]
    fn test_apns_requires_existing_certificate() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let ok = record(Some(file.path().to_path_buf()), Some("secret"), None);
        assert!(matches!(
            Credentials::for_provider(Provider::Apns, Some(&ok)),
            Ok(Credentials::Certificate { .. })
        ));

        let no_pass = record(Some(file.path().to_path_buf()), None, None);
        assert!(Credentials::for_provider(Provider::Apns, Some(&no_pass)).is_err());

        let missing_file = record(Some("/nonexistent/cert.pem".into()), Some("secret"), None);
        assert!(matches!(
            Credentials::for_provider(Provider::Apns, Some(&missing_file)),
            Err(PushError::Configuration(_))
        ));
        assert!(Credentials::for_provider(Provider::Apns, None).is_err());
    }

    #[test]
    fn test_gcm_requires_token() {
        let ok = record(None, None, Some("key"));
        assert_eq!(
            Credentials::for_provider(Provider::Gcm, Some(&ok)).unwrap(),
            Credentials::AuthToken("key".into())
        );
        assert!(Credentials::for_provider(Provider::Gcm, Some(&record(None, None, Some(" ")))).is_err());
        assert!(Credentials::for_provider(Provider::Gcm, None).is_err());
    }

    #[test]
    fn test_mpns_allows_unauthenticated() {
        let credentials = Credentials::for_provider(Provider::Mpns, None).unwrap();
        assert!(!credentials.is_authenticated());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", Credentials::AuthToken("top-secret".into()));
        assert!(!debug.contains("top-secret"));
    }
}
