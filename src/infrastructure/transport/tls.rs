//! TLS client configuration for certificate-authenticated providers.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::error::{PushError, Result};
use crate::service::Credentials;

/// Client certificate chain and key read from a PEM bundle.
pub struct ClientIdentity {
    pub certificates: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl ClientIdentity {
    /// Read a PEM bundle holding the certificate chain and an unencrypted private key.
    pub fn from_pem_file(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let certificates = rustls_pemfile::certs(&mut reader).collect::<std::result::Result<Vec<_>, _>>()?;
        if certificates.is_empty() {
            return Err(PushError::configuration(format!(
                "No certificate found in '{}'",
                path.display()
            )));
        }

        let mut reader = BufReader::new(File::open(path)?);
        let key = rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| {
            PushError::configuration(format!(
                "No unencrypted private key found in '{}'",
                path.display()
            ))
        })?;

        Ok(Self { certificates, key })
    }
}

/// Build a rustls client configuration for the given credentials.
///
/// Certificate credentials become the client identity. With `verify_peer`
/// unset, server certificates are accepted without chain validation.
pub fn client_config(credentials: &Credentials, verify_peer: bool) -> Result<Arc<ClientConfig>> {
    let provider = Arc::new(ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let builder = if verify_peer {
        builder.with_root_certificates(native_roots())
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
    };

    let config = match credentials {
        Credentials::Certificate { certificate, .. } => {
            let identity = ClientIdentity::from_pem_file(certificate)?;
            builder.with_client_auth_cert(identity.certificates, identity.key)?
        }
        Credentials::AuthToken(_) | Credentials::Null => builder.with_no_client_auth(),
    };

    Ok(Arc::new(config))
}

fn native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certificates) => {
            let (added, ignored) = roots.add_parsable_certificates(certificates);
            tracing::debug!(added, ignored, "Loaded native root certificates");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load native root certificates");
        }
    }
    roots
}

/// Verifier used when peer verification is disabled. Handshake signatures
/// are still checked.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_null_credentials_without_verification() {
        let config = client_config(&Credentials::Null, false);
        assert!(config.is_ok());
    }

    #[test]
    fn test_identity_requires_certificate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a pem bundle").unwrap();
        assert!(matches!(
            ClientIdentity::from_pem_file(file.path()),
            Err(PushError::Configuration(_))
        ));
    }
}
