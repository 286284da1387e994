use std::fmt;

use serde::Serialize;

use crate::error::Result;
use crate::provider::Provider;

/// Lifecycle state of a recipient device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierStatus {
    /// Identifier is valid (default)
    #[default]
    Active,
    /// Device is temporarily unavailable
    NotReady,
    /// Identifier is permanently invalid
    NotRegistered,
    /// Sender should use the replacement identifier on future requests
    NeedsReplacement,
}

/// A single target device of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientDevice {
    provider: Provider,
    identifier: String,
    status: IdentifierStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    replacement: Option<String>,
}

impl RecipientDevice {
    /// Create a recipient, validating the identifier against the provider's token grammar.
    pub fn new(provider: Provider, identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        provider.validate_token(&identifier)?;

        Ok(Self {
            provider,
            identifier,
            status: IdentifierStatus::Active,
            replacement: None,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn status(&self) -> IdentifierStatus {
        self.status
    }

    /// Identifier the sender should switch to, if the provider supplied one.
    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    /// Whether a provider flagged this recipient.
    pub fn is_flagged(&self) -> bool {
        self.status != IdentifierStatus::Active
    }

    /// Move to a new status. Returns `false` when the transition is refused.
    ///
    /// Once flagged, a recipient never returns to `Active`.
    pub fn set_status(&mut self, status: IdentifierStatus) -> bool {
        if status == IdentifierStatus::Active && self.is_flagged() {
            tracing::debug!(
                identifier = %self.identifier,
                current = ?self.status,
                "Refusing to reset flagged recipient to active"
            );
            return false;
        }
        self.status = status;
        true
    }

    pub fn mark_not_registered(&mut self) -> bool {
        self.set_status(IdentifierStatus::NotRegistered)
    }

    pub fn mark_not_ready(&mut self) -> bool {
        self.set_status(IdentifierStatus::NotReady)
    }

    /// Attach a replacement identifier and mark the recipient accordingly.
    pub fn replace_with(&mut self, identifier: impl Into<String>) -> bool {
        if !self.set_status(IdentifierStatus::NeedsReplacement) {
            return false;
        }
        self.replacement = Some(identifier.into());
        true
    }
}

impl fmt::Display for RecipientDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PushError;

    #[test]
    fn test_new_recipient_is_active() {
        let device = RecipientDevice::new(Provider::Gcm, "device1").unwrap();
        assert_eq!(device.identifier(), "device1");
        assert_eq!(device.status(), IdentifierStatus::Active);
        assert!(!device.is_flagged());
        assert_eq!(device.to_string(), "device1");
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let err = RecipientDevice::new(Provider::Apns, "not-a-token").unwrap_err();
        assert!(matches!(err, PushError::InvalidArgument(_)));
    }

    #[test]
    fn test_status_never_resets_to_active() {
        let mut device = RecipientDevice::new(Provider::Gcm, "device1").unwrap();
        assert!(device.mark_not_ready());
        assert!(!device.set_status(IdentifierStatus::Active));
        assert_eq!(device.status(), IdentifierStatus::NotReady);

        assert!(device.mark_not_registered());
        assert_eq!(device.status(), IdentifierStatus::NotRegistered);
    }

    #[test]
    fn test_replacement_identifier() {
        let mut device = RecipientDevice::new(Provider::Gcm, "device1").unwrap();
        assert!(device.replace_with("device1-new"));
        assert_eq!(device.status(), IdentifierStatus::NeedsReplacement);
        assert_eq!(device.replacement(), Some("device1-new"));
    }
}
