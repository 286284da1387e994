use std::collections::BTreeMap;

use bytes::Bytes;
use uuid::Uuid;

use crate::message::RecipientDevice;
use crate::provider::Provider;

/// One provider-bound unit of work: a serialized payload and the batch it addresses.
#[derive(Debug, Clone)]
pub struct Notification {
    id: Uuid,
    wire_id: u32,
    provider: Provider,
    message_id: String,
    payload: Bytes,
    recipients: Vec<RecipientDevice>,
    custom_data: BTreeMap<String, String>,
}

impl Notification {
    pub(crate) fn new(
        wire_id: u32,
        provider: Provider,
        message_id: impl Into<String>,
        payload: Bytes,
        recipients: Vec<RecipientDevice>,
        custom_data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wire_id,
            provider,
            message_id: message_id.into(),
            payload,
            recipients,
            custom_data,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sequence number carried in binary frames, echoed back by APNS error packets.
    pub fn wire_id(&self) -> u32 {
        self.wire_id
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn recipients(&self) -> &[RecipientDevice] {
        &self.recipients
    }

    /// Provider metadata used by the transport, e.g. MPNS delivery headers.
    pub fn custom_data(&self) -> &BTreeMap<String, String> {
        &self.custom_data
    }

    pub fn custom_value(&self, key: &str) -> Option<&str> {
        self.custom_data.get(key).map(String::as_str)
    }
}
