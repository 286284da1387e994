use std::collections::BTreeMap;

use super::{Payload, PayloadHandler};
use crate::error::{PushError, Result};
use crate::message::{MessageBatch, MessageContent, MpnsBody};
use crate::notification::xml::{XmlDocument, XmlElement};
use crate::provider::Provider;

const NAMESPACE_PREFIX: &str = "wp";
const NAMESPACE: &str = "WPNotification";

pub struct MpnsPayloadHandler;

impl MpnsPayloadHandler {
    fn element<const N: usize>(name: &str, properties: [(&'static str, Option<String>); N]) -> XmlElement {
        properties
            .into_iter()
            .filter_map(|(property, value)| value.filter(|v| !v.is_empty()).map(|v| (property, v)))
            .fold(
                XmlElement::new(format!("{}:{}", NAMESPACE_PREFIX, name)),
                |element, (property, value)| {
                    element.child(
                        XmlElement::new(format!("{}:{}", NAMESPACE_PREFIX, property)).text(value),
                    )
                },
            )
    }
}

impl PayloadHandler for MpnsPayloadHandler {
    fn provider(&self) -> Provider {
        Provider::Mpns
    }

    fn create_payload(&self, batch: &MessageBatch<'_>) -> Result<Payload> {
        let MessageContent::Mpns(content) = batch.content() else {
            return Err(PushError::Domain(format!(
                "MPNS payload handler cannot handle {} messages",
                batch.message.provider()
            )));
        };

        let body = match &content.body {
            MpnsBody::Tile(tile) => Self::element("Tile", tile.properties()),
            MpnsBody::Toast(toast) => Self::element("Toast", toast.properties()),
            MpnsBody::Raw(raw) => raw
                .entries()
                .iter()
                .fold(XmlElement::new("root"), |root, (key, value)| {
                    root.child(XmlElement::new(key.as_str()).escaped_text(value.as_str()))
                }),
        };

        let root = XmlElement::new(format!("{}:Notification", NAMESPACE_PREFIX))
            .attribute(format!("xmlns:{}", NAMESPACE_PREFIX), NAMESPACE)
            .child(body);

        Ok(Payload::Xml(XmlDocument::new(root)))
    }

    fn custom_notification_data(&self, batch: &MessageBatch<'_>) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        data.insert("message_id".to_string(), batch.message_id().to_string());
        if let MessageContent::Mpns(content) = batch.content() {
            data.insert("delay_interval".to_string(), content.delivery_class().to_string());
            data.insert("message_type".to_string(), content.kind().as_str().to_string());
        }
        data
    }
}
