//! Application-level messages and their recipients.
//!
//! A [`Message`] carries provider-specific content and a set of recipients
//! that all belong to the same provider. Building partitions the recipients
//! into [`MessageBatch`] views; the message itself is never mutated by a
//! dispatch pass.

mod apns;
mod collection;
mod gcm;
mod mpns;
mod recipient;

pub use apns::ApnsMessage;
pub use collection::MessageCollection;
pub use gcm::{CollapseKey, GcmMessage};
pub use mpns::{
    DeliveryInterval, MpnsBody, MpnsKind, MpnsMessage, MpnsRaw, MpnsTile, MpnsToast,
};
pub use recipient::{IdentifierStatus, RecipientDevice};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{PushError, Result};
use crate::provider::Provider;

/// Lifetime of a message when the caller does not set an expiration.
const DEFAULT_EXPIRATION_WEEKS: i64 = 4;

/// Provider-specific content of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Apns(ApnsMessage),
    Gcm(GcmMessage),
    Mpns(MpnsMessage),
}

impl MessageContent {
    pub fn provider(&self) -> Provider {
        match self {
            MessageContent::Apns(_) => Provider::Apns,
            MessageContent::Gcm(_) => Provider::Gcm,
            MessageContent::Mpns(_) => Provider::Mpns,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            MessageContent::Apns(content) => content.validate(),
            MessageContent::Gcm(content) => content.validate(),
            MessageContent::Mpns(_) => Ok(()),
        }
    }

    fn from_value(provider: Provider, value: Value) -> Result<Self> {
        let content = match provider {
            Provider::Apns => MessageContent::Apns(serde_json::from_value(value).map_err(
                |e| PushError::invalid_argument(format!("Invalid APNS content: {}", e)),
            )?),
            Provider::Gcm => MessageContent::Gcm(serde_json::from_value(value).map_err(|e| {
                PushError::invalid_argument(format!("Invalid GCM content: {}", e))
            })?),
            Provider::Mpns => MessageContent::Mpns(serde_json::from_value(value).map_err(
                |e| PushError::invalid_argument(format!("Invalid MPNS content: {}", e)),
            )?),
        };
        content.validate()?;
        Ok(content)
    }
}

impl From<ApnsMessage> for MessageContent {
    fn from(content: ApnsMessage) -> Self {
        MessageContent::Apns(content)
    }
}

impl From<GcmMessage> for MessageContent {
    fn from(content: GcmMessage) -> Self {
        MessageContent::Gcm(content)
    }
}

impl From<MpnsMessage> for MessageContent {
    fn from(content: MpnsMessage) -> Self {
        MessageContent::Mpns(content)
    }
}

/// JSON shape accepted by [`Message::from_json`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MessageDocument {
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    recipients: Vec<String>,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
    #[serde(default)]
    content: Value,
}

/// A message addressed to one or more devices of a single provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    id: String,
    expiration: DateTime<Utc>,
    recipients: Vec<RecipientDevice>,
    content: MessageContent,
}

impl Message {
    /// Create a message with a fresh identifier and the default expiration.
    pub fn new(content: impl Into<MessageContent>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            expiration: Utc::now() + Duration::weeks(DEFAULT_EXPIRATION_WEEKS),
            recipients: Vec::new(),
            content: content.into(),
        }
    }

    /// Build a message from a JSON document.
    ///
    /// Expected shape: `{"identifier"?, "recipients": [...], "expiration"?, "content": {...}}`.
    pub fn from_json(provider: Provider, document: Value) -> Result<Self> {
        let document: MessageDocument = serde_json::from_value(document)
            .map_err(|e| PushError::invalid_argument(format!("Invalid message document: {}", e)))?;

        let content = if document.content.is_null() {
            MessageContent::from_value(provider, Value::Object(Default::default()))?
        } else {
            MessageContent::from_value(provider, document.content)?
        };

        let mut message = Message::new(content);
        if let Some(identifier) = document.identifier {
            message = message.with_id(identifier);
        }
        if let Some(expiration) = document.expiration {
            message.set_expiration(expiration);
        }
        for token in document.recipients {
            message.add_recipient(token)?;
        }
        Ok(message)
    }

    /// Replace the generated identifier with a caller-supplied one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> Provider {
        self.content.provider()
    }

    pub fn content(&self) -> &MessageContent {
        &self.content
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub fn set_expiration(&mut self, expiration: DateTime<Utc>) -> &mut Self {
        self.expiration = expiration;
        self
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = expiration;
        self
    }

    pub fn recipients(&self) -> &[RecipientDevice] {
        &self.recipients
    }

    /// Add a recipient token, validated against this message's provider.
    pub fn add_recipient(&mut self, token: impl Into<String>) -> Result<&mut Self> {
        let device = RecipientDevice::new(self.provider(), token)?;
        self.recipients.push(device);
        Ok(self)
    }

    pub fn with_recipient(mut self, token: impl Into<String>) -> Result<Self> {
        self.add_recipient(token)?;
        Ok(self)
    }

    /// Add an already constructed recipient. It must belong to the same provider.
    pub fn add_recipient_device(&mut self, device: RecipientDevice) -> Result<&mut Self> {
        if device.provider() != self.provider() {
            return Err(PushError::invalid_argument(format!(
                "Recipient of {} cannot be added to a {} message",
                device.provider(),
                self.provider()
            )));
        }
        self.recipients.push(device);
        Ok(self)
    }

    pub fn max_recipients_per_message(&self) -> usize {
        self.provider().max_recipients_per_message()
    }

    pub fn payload_max_length(&self) -> usize {
        self.provider().payload_max_length()
    }

    /// Split recipients into provider-sized batches, in insertion order.
    pub fn batches(&self) -> impl Iterator<Item = MessageBatch<'_>> {
        self.recipients
            .chunks(self.max_recipients_per_message())
            .enumerate()
            .map(move |(index, recipients)| MessageBatch {
                message: self,
                recipients,
                index,
            })
    }
}

/// A view of a message restricted to one batch of its recipients.
#[derive(Debug, Clone, Copy)]
pub struct MessageBatch<'a> {
    pub message: &'a Message,
    pub recipients: &'a [RecipientDevice],
    pub index: usize,
}

impl<'a> MessageBatch<'a> {
    pub fn content(&self) -> &'a MessageContent {
        &self.message.content
    }

    pub fn message_id(&self) -> &'a str {
        &self.message.id
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.message.expiration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const APNS_TOKEN: &str = "4efa148eb41f2e7103f21410bf48346c1afa148eb41f2e7103f21410bf48346c";

    fn gcm_message(recipients: usize) -> Message {
        let mut message = Message::new(GcmMessage::new());
        for i in 0..recipients {
            message.add_recipient(format!("device{}", i)).unwrap();
        }
        message
    }

    #[test]
    fn test_new_message_defaults() {
        let message = Message::new(ApnsMessage::new().alert("hi"));
        assert_eq!(message.provider(), Provider::Apns);
        assert_eq!(message.id().len(), 32);
        assert!(message.recipients().is_empty());

        let remaining = message.expiration() - Utc::now();
        assert!(remaining > Duration::weeks(4) - Duration::minutes(1));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::new(GcmMessage::new());
        let b = Message::new(GcmMessage::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_add_recipient_validates_token() {
        let mut message = Message::new(ApnsMessage::new());
        assert!(message.add_recipient(APNS_TOKEN).is_ok());
        assert!(matches!(
            message.add_recipient("device1"),
            Err(PushError::InvalidArgument(_))
        ));
        assert_eq!(message.recipients().len(), 1);
    }

    #[test]
    fn test_add_recipient_device_rejects_other_provider() {
        let mut message = Message::new(ApnsMessage::new());
        let device = RecipientDevice::new(Provider::Gcm, "device1").unwrap();
        assert!(message.add_recipient_device(device).is_err());
    }

    #[test]
    fn test_batches_respect_limit() {
        let message = gcm_message(2501);
        let sizes: Vec<usize> = message.batches().map(|b| b.recipients.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 501]);

        let exact = gcm_message(2000);
        assert_eq!(exact.batches().count(), 2);

        let empty = gcm_message(0);
        assert_eq!(empty.batches().count(), 0);
    }

    #[test]
    fn test_batches_preserve_order_and_completeness() {
        let message = gcm_message(1500);
        let flattened: Vec<&str> = message
            .batches()
            .flat_map(|b| b.recipients.iter().map(|r| r.identifier()))
            .collect();
        let original: Vec<&str> = message.recipients().iter().map(|r| r.identifier()).collect();
        assert_eq!(flattened, original);
    }

    #[test]
    fn test_from_json() {
        let message = Message::from_json(
            Provider::Gcm,
            json!({
                "identifier": "msg-1",
                "recipients": ["device1", "device2"],
                "expiration": "2030-01-01T00:00:00Z",
                "content": {"collapseKey": 1, "payloadData": {"key": "val"}}
            }),
        )
        .unwrap();

        assert_eq!(message.id(), "msg-1");
        assert_eq!(message.recipients().len(), 2);
        assert_eq!(message.expiration().to_rfc3339(), "2030-01-01T00:00:00+00:00");
        match message.content() {
            MessageContent::Gcm(content) => {
                assert_eq!(content.collapse_key, Some(CollapseKey::Numeric(1)))
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        let unknown = Message::from_json(Provider::Apns, json!({"bogus": 1}));
        assert!(matches!(unknown, Err(PushError::InvalidArgument(_))));

        let wrong_type = Message::from_json(Provider::Apns, json!({"content": {"badge": "one"}}));
        assert!(matches!(wrong_type, Err(PushError::InvalidArgument(_))));

        let bad_token = Message::from_json(Provider::Mpns, json!({
            "recipients": ["not base64!"],
            "content": {"body": {"toast": {"text1": "hi"}}}
        }));
        assert!(matches!(bad_token, Err(PushError::InvalidArgument(_))));
    }
}
