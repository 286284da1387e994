//! Supported push providers.
//!
//! The provider tag is the single registration point for everything that
//! differs between services: recipient token grammar, batching limits and
//! payload size limits. Payload handlers, response parsers and service
//! clients are all looked up by this tag.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{PushError, Result};

/// Length of an APNS device token in hexadecimal characters.
const APNS_TOKEN_HEX_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Apple Push Notification service (binary socket protocol)
    Apns,
    /// Google Cloud Messaging (JSON over HTTP)
    Gcm,
    /// Microsoft Push Notification Service (XML over HTTP)
    Mpns,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Apns, Provider::Gcm, Provider::Mpns];

    /// Service name as used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Apns => "APNS",
            Provider::Gcm => "GCM",
            Provider::Mpns => "MPNS",
        }
    }

    /// Key of this provider in configuration sources.
    pub fn config_key(&self) -> &'static str {
        match self {
            Provider::Apns => "apns",
            Provider::Gcm => "gcm",
            Provider::Mpns => "mpns",
        }
    }

    /// Number of recipients a single wire request may address.
    ///
    /// APNS and MPNS do not support multicast.
    pub fn max_recipients_per_message(&self) -> usize {
        match self {
            Provider::Apns => 1,
            Provider::Gcm => 1000,
            Provider::Mpns => 1,
        }
    }

    /// Maximum serialized payload size in bytes.
    pub fn payload_max_length(&self) -> usize {
        match self {
            Provider::Apns => 2048,
            Provider::Gcm => 4096,
            Provider::Mpns => 3072,
        }
    }

    /// Whether the provider exposes a stale-token feedback channel.
    pub fn has_feedback(&self) -> bool {
        matches!(self, Provider::Apns)
    }

    /// Validate a recipient token against this provider's grammar.
    pub fn validate_token(&self, token: &str) -> Result<()> {
        match self {
            Provider::Apns => {
                if token.is_empty() || !token.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(PushError::invalid_argument(format!(
                        "Device token must be a hexadecimal string, got \"{}\"",
                        token
                    )));
                }
                if token.len() != APNS_TOKEN_HEX_LENGTH {
                    return Err(PushError::invalid_argument(format!(
                        "Device token must be {} characters long, got {}",
                        APNS_TOKEN_HEX_LENGTH,
                        token.len()
                    )));
                }
                Ok(())
            }
            Provider::Gcm => {
                let valid = !token.is_empty()
                    && token
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
                if !valid {
                    return Err(PushError::invalid_argument(format!(
                        "Registration id must match [0-9a-zA-Z_-]+, got \"{}\"",
                        token
                    )));
                }
                Ok(())
            }
            Provider::Mpns => {
                let canonical = !token.is_empty()
                    && STANDARD
                        .decode(token)
                        .map(|raw| STANDARD.encode(raw) == token)
                        .unwrap_or(false);
                if !canonical {
                    return Err(PushError::invalid_argument(format!(
                        "Device token must be a base64 string, got \"{}\"",
                        token
                    )));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = PushError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "apns" => Ok(Provider::Apns),
            "gcm" => Ok(Provider::Gcm),
            "mpns" => Ok(Provider::Mpns),
            other => Err(PushError::Domain(format!(
                "Notification service '{}' is not supported",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APNS_TOKEN: &str = "4efa148eb41f2e7103f21410bf48346c1afa148eb41f2e7103f21410bf48346c";

    #[test]
    fn test_apns_token_accepts_64_hex() {
        assert!(Provider::Apns.validate_token(APNS_TOKEN).is_ok());
        assert!(Provider::Apns
            .validate_token(&APNS_TOKEN.to_uppercase())
            .is_ok());
    }

    #[test]
    fn test_apns_token_rejects_non_hex_and_wrong_length() {
        let non_hex = format!("{}zz", &APNS_TOKEN[..62]);
        assert!(matches!(
            Provider::Apns.validate_token(&non_hex),
            Err(PushError::InvalidArgument(_))
        ));
        assert!(matches!(
            Provider::Apns.validate_token(&APNS_TOKEN[..63]),
            Err(PushError::InvalidArgument(_))
        ));
        assert!(Provider::Apns.validate_token("").is_err());
    }

    #[test]
    fn test_gcm_token_grammar() {
        assert!(Provider::Gcm.validate_token("device1").is_ok());
        assert!(Provider::Gcm.validate_token("APA91b-Hx_2").is_ok());
        assert!(Provider::Gcm.validate_token("has space").is_err());
        assert!(Provider::Gcm.validate_token("").is_err());
    }

    #[test]
    fn test_mpns_token_requires_base64() {
        assert!(Provider::Mpns.validate_token("dGVzdC1jaGFubmVs").is_ok());
        assert!(Provider::Mpns.validate_token("not base64!").is_err());
        assert!(Provider::Mpns.validate_token("abc").is_err());
    }

    #[test]
    fn test_limits() {
        assert_eq!(Provider::Apns.max_recipients_per_message(), 1);
        assert_eq!(Provider::Gcm.max_recipients_per_message(), 1000);
        assert_eq!(Provider::Mpns.payload_max_length(), 3072);
    }

    #[test]
    fn test_parse_provider() {
        assert_eq!("APNS".parse::<Provider>().unwrap(), Provider::Apns);
        assert_eq!("gcm".parse::<Provider>().unwrap(), Provider::Gcm);
        assert!("wns".parse::<Provider>().is_err());
    }
}
