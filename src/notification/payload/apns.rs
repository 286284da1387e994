use bytes::{BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};

use super::{Payload, PayloadHandler};
use crate::error::{PushError, Result};
use crate::message::{MessageBatch, MessageContent};
use crate::provider::Provider;

/// Command byte of the simple notification frame with identifier and expiry.
const PUSH_COMMAND: u8 = 1;
/// Binary device token length.
const TOKEN_LENGTH: u16 = 32;

pub struct ApnsPayloadHandler;

impl PayloadHandler for ApnsPayloadHandler {
    fn provider(&self) -> Provider {
        Provider::Apns
    }

    fn create_payload(&self, batch: &MessageBatch<'_>) -> Result<Payload> {
        let MessageContent::Apns(content) = batch.content() else {
            return Err(PushError::Domain(format!(
                "APNS payload handler cannot handle {} messages",
                batch.message.provider()
            )));
        };

        let mut aps = Map::new();
        if let Some(alert) = &content.alert {
            aps.insert("alert".into(), Value::from(alert.as_str()));
        }
        if let Some(badge) = content.badge {
            aps.insert("badge".into(), Value::from(badge));
        }
        if let Some(sound) = &content.sound {
            aps.insert("sound".into(), Value::from(sound.as_str()));
        }
        if let Some(category) = &content.category {
            aps.insert("category".into(), Value::from(category.as_str()));
        }
        if !content.url_args.is_empty() {
            aps.insert("url-args".into(), Value::from(content.url_args.clone()));
        }
        if content.content_available {
            aps.insert("content-available".into(), Value::from(1));
        }
        if content.mutable_content {
            aps.insert("mutable-content".into(), Value::from(1));
        }

        let mut payload = Map::new();
        payload.insert("aps".into(), Value::Object(aps));
        for (key, value) in &content.custom_payload_data {
            if key == "aps" {
                return Err(PushError::invalid_argument(
                    "Custom payload data must not redefine the 'aps' key",
                ));
            }
            payload.insert(key.clone(), value.clone());
        }

        Ok(Payload::Json(Value::Object(payload)))
    }

    /// Frame layout, all integers big-endian:
    /// command(1) | identifier(4) | expiry(4) | token length(2) | token(32) | payload length(2) | payload
    fn pack_payload(&self, body: Vec<u8>, batch: &MessageBatch<'_>, wire_id: u32) -> Result<Bytes> {
        let recipient = match batch.recipients {
            [recipient] => recipient,
            other => {
                return Err(PushError::Domain(format!(
                    "APNS frames address exactly one device, got {}",
                    other.len()
                )))
            }
        };

        let token = hex::decode(recipient.identifier()).map_err(|e| {
            PushError::invalid_argument(format!("Device token is not hexadecimal: {}", e))
        })?;
        let body_length = u16::try_from(body.len()).map_err(|_| {
            PushError::MalformedNotification(format!("Payload of {} bytes cannot be framed", body.len()))
        })?;
        let expiry = u32::try_from(batch.expiration().timestamp().max(0)).unwrap_or(u32::MAX);

        let mut frame = BytesMut::with_capacity(1 + 4 + 4 + 2 + token.len() + 2 + body.len());
        frame.put_u8(PUSH_COMMAND);
        frame.put_u32(wire_id);
        frame.put_u32(expiry);
        frame.put_u16(TOKEN_LENGTH);
        frame.put_slice(&token);
        frame.put_u16(body_length);
        frame.put_slice(&body);

        Ok(frame.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ApnsMessage, Message};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const TOKEN: &str = "4efa148eb41f2e7103f21410bf48346c1afa148eb41f2e7103f21410bf48346c";

    fn message() -> Message {
        let content = ApnsMessage::new()
            .alert("Text of an alert")
            .sound("test")
            .badge(1)
            .content_available(true)
            .custom("key", json!("val"));
        Message::new(content).with_recipient(TOKEN).unwrap()
    }

    #[test]
    fn test_create_payload_exact_shape() {
        let message = message();
        let batch = message.batches().next().unwrap();
        let payload = ApnsPayloadHandler.create_payload(&batch).unwrap();
        let body = String::from_utf8(payload.encode().unwrap()).unwrap();
        assert_eq!(
            body,
            r#"{"aps":{"alert":"Text of an alert","badge":1,"sound":"test","content-available":1},"key":"val"}"#
        );
    }

    #[test]
    fn test_flags_and_url_args() {
        let message = Message::new(
            ApnsMessage::new()
                .category("news")
                .url_args(vec!["a".into()])
                .mutable_content(true),
        )
        .with_recipient(TOKEN)
        .unwrap();
        let batch = message.batches().next().unwrap();
        let Payload::Json(value) = ApnsPayloadHandler.create_payload(&batch).unwrap() else {
            panic!("expected json payload");
        };
        assert_eq!(
            value,
            json!({"aps": {"category": "news", "url-args": ["a"], "mutable-content": 1}})
        );
    }

    #[test]
    fn test_pack_payload_frame() {
        let expiration = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let message = message().with_expiration(expiration);
        let batch = message.batches().next().unwrap();
        let body = b"{\"aps\":{}}".to_vec();
        let frame = ApnsPayloadHandler.pack_payload(body.clone(), &batch, 7).unwrap();

        assert_eq!(frame[0], 1);
        assert_eq!(&frame[1..5], &7u32.to_be_bytes());
        assert_eq!(&frame[5..9], &(expiration.timestamp() as u32).to_be_bytes());
        assert_eq!(&frame[9..11], &32u16.to_be_bytes());
        assert_eq!(&frame[11..43], hex::decode(TOKEN).unwrap().as_slice());
        assert_eq!(&frame[43..45], &(body.len() as u16).to_be_bytes());
        assert_eq!(&frame[45..], body.as_slice());
    }

    #[test]
    fn test_priority_does_not_change_frame() {
        let expiration = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let frame_for = |content: ApnsMessage| {
            let message = Message::new(content)
                .with_expiration(expiration)
                .with_recipient(TOKEN)
                .unwrap();
            let batch = message.batches().next().unwrap();
            let body = ApnsPayloadHandler.create_payload(&batch).unwrap().encode().unwrap();
            ApnsPayloadHandler.pack_payload(body, &batch, 3).unwrap()
        };

        let plain = frame_for(ApnsMessage::new().alert("hi"));
        let prioritized = frame_for(ApnsMessage::new().alert("hi").priority(5));
        assert_eq!(plain, prioritized);
    }
}
