//! Per-provider payload construction.
//!
//! Each handler turns a [`MessageBatch`] into the provider's wire body.
//! Handlers are registered in the `NotificationBuilder` by provider tag.

mod apns;
mod gcm;
mod mpns;

pub use apns::ApnsPayloadHandler;
pub use gcm::GcmPayloadHandler;
pub use mpns::MpnsPayloadHandler;

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;

use crate::error::Result;
use crate::message::{Message, MessageBatch};
use crate::notification::xml::XmlDocument;
use crate::provider::Provider;

/// Structured payload before serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Xml(XmlDocument),
}

impl Payload {
    /// Serialized document body.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Payload::Json(value) => Ok(serde_json::to_vec(value)?),
            Payload::Xml(document) => Ok(document.to_string().into_bytes()),
        }
    }
}

pub trait PayloadHandler: Send + Sync {
    fn provider(&self) -> Provider;

    /// Whether this handler understands the message's content variant.
    fn is_supported(&self, message: &Message) -> bool {
        message.provider() == self.provider()
    }

    fn create_payload(&self, batch: &MessageBatch<'_>) -> Result<Payload>;

    /// Frame an encoded body for the wire. HTTP providers send the body as is.
    fn pack_payload(&self, body: Vec<u8>, _batch: &MessageBatch<'_>, _wire_id: u32) -> Result<Bytes> {
        Ok(Bytes::from(body))
    }

    /// Limit applied to the packed wire payload, framing included.
    fn payload_max_length(&self) -> usize {
        self.provider().payload_max_length()
    }

    fn custom_notification_data(&self, _batch: &MessageBatch<'_>) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}
