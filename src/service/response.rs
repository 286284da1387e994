use bytes::Bytes;

use crate::message::RecipientDevice;
use crate::provider::Provider;
use crate::service::{apns, gcm, mpns};

/// Raw provider response, as received by a service client.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// Error packet read after a write; `None` when the gateway stayed silent.
    Apns {
        packet: Option<Bytes>,
        recipients: Vec<RecipientDevice>,
    },
    Gcm {
        status: u16,
        body: Bytes,
        recipients: Vec<RecipientDevice>,
    },
    Mpns {
        status: u16,
        recipients: Vec<RecipientDevice>,
    },
    /// Stale-token stream from a feedback service.
    Feedback { provider: Provider, data: Bytes },
}

impl ProviderResponse {
    pub fn provider(&self) -> Provider {
        match self {
            ProviderResponse::Apns { .. } => Provider::Apns,
            ProviderResponse::Gcm { .. } => Provider::Gcm,
            ProviderResponse::Mpns { .. } => Provider::Mpns,
            ProviderResponse::Feedback { provider, .. } => *provider,
        }
    }

    /// Decode into a uniform outcome.
    pub fn parse(self) -> ResponseOutcome {
        match self {
            ProviderResponse::Apns { packet, .. } => apns::parse_error_packet(packet.as_deref()),
            ProviderResponse::Gcm {
                status,
                body,
                recipients,
            } => gcm::parse_response(status, &body, recipients),
            ProviderResponse::Mpns { status, recipients } => mpns::parse_response(status, recipients),
            ProviderResponse::Feedback {
                provider: Provider::Apns,
                data,
            } => apns::parse_feedback(&data),
            ProviderResponse::Feedback { provider, .. } => ResponseOutcome::ProtocolViolation {
                description: format!("{} has no feedback service", provider),
            },
        }
    }
}

/// What a provider said about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    Success,
    /// Some recipients were flagged. Carries the whole batch, flagged or not.
    InvalidRecipients { recipients: Vec<RecipientDevice> },
    /// Provider-side rejection: authentication, quota, availability.
    DispatchError { code: u16, description: String },
    /// The provider could not parse the request.
    Malformed { code: u16, description: String },
    /// Unexpected status, packet or body.
    ProtocolViolation { description: String },
}

impl ResponseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseOutcome::Success)
    }

    /// Code recorded against the message, for dispatch and malformed errors.
    pub fn error_code(&self) -> Option<u16> {
        match self {
            ResponseOutcome::DispatchError { code, .. } | ResponseOutcome::Malformed { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    /// Recipients a provider flagged.
    pub fn flagged_recipients(&self) -> impl Iterator<Item = &RecipientDevice> {
        let recipients = match self {
            ResponseOutcome::InvalidRecipients { recipients } => recipients.as_slice(),
            _ => &[],
        };
        recipients.iter().filter(|r| r.is_flagged())
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ResponseOutcome::Success => "success",
            ResponseOutcome::InvalidRecipients { .. } => "invalid_recipients",
            ResponseOutcome::DispatchError { .. } => "dispatch",
            ResponseOutcome::Malformed { .. } => "malformed",
            ResponseOutcome::ProtocolViolation { .. } => "runtime",
        }
    }
}
