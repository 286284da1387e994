use std::collections::HashMap;
use std::iter::Enumerate;
use std::slice::Chunks;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{PushError, Result};
use crate::message::{Message, MessageBatch, RecipientDevice};
use crate::metrics::NotificationMetrics;
use crate::notification::payload::{
    ApnsPayloadHandler, GcmPayloadHandler, MpnsPayloadHandler, PayloadHandler,
};
use crate::notification::Notification;
use crate::provider::Provider;

/// Turns messages into provider-sized, serialized notifications.
pub struct NotificationBuilder {
    handlers: HashMap<Provider, Arc<dyn PayloadHandler>>,
    next_wire_id: AtomicU32,
}

impl NotificationBuilder {
    /// Builder with the handlers for every supported provider.
    pub fn new() -> Self {
        let mut builder = Self::empty();
        builder.register(Arc::new(ApnsPayloadHandler));
        builder.register(Arc::new(GcmPayloadHandler));
        builder.register(Arc::new(MpnsPayloadHandler));
        builder
    }

    /// Builder without handlers.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            next_wire_id: AtomicU32::new(1),
        }
    }

    /// Register a handler, replacing any previous one for the same provider.
    pub fn register(&mut self, handler: Arc<dyn PayloadHandler>) {
        self.handlers.insert(handler.provider(), handler);
    }

    fn handler_for(&self, message: &Message) -> Result<Arc<dyn PayloadHandler>> {
        self.handlers
            .get(&message.provider())
            .filter(|handler| handler.is_supported(message))
            .cloned()
            .ok_or_else(|| {
                PushError::Domain(format!(
                    "No payload handler registered for {} messages",
                    message.provider()
                ))
            })
    }

    /// Lazily build one notification per recipient batch.
    ///
    /// Fails up front when the message content is invalid or no handler
    /// supports it. Each yielded item is scoped to its batch: a payload over
    /// the provider limit yields `Err(MalformedNotification)` and iteration
    /// continues with the next batch.
    pub fn build_notifications<'a>(&'a self, message: &'a Message) -> Result<NotificationBatches<'a>> {
        message.content().validate()?;
        let handler = self.handler_for(message)?;

        Ok(NotificationBatches {
            builder: self,
            handler,
            message,
            chunks: message
                .recipients()
                .chunks(message.max_recipients_per_message())
                .enumerate(),
        })
    }

    fn next_wire_id(&self) -> u32 {
        self.next_wire_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for NotificationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the notifications of one message.
pub struct NotificationBatches<'a> {
    builder: &'a NotificationBuilder,
    handler: Arc<dyn PayloadHandler>,
    message: &'a Message,
    chunks: Enumerate<Chunks<'a, RecipientDevice>>,
}

impl NotificationBatches<'_> {
    fn build(&self, batch: MessageBatch<'_>) -> Result<Notification> {
        let provider = self.handler.provider();
        let payload = self.handler.create_payload(&batch)?;
        let body = payload.encode()?;

        let wire_id = self.builder.next_wire_id();
        let packed = match self.handler.pack_payload(body, &batch, wire_id) {
            Ok(packed) => packed,
            Err(e @ PushError::MalformedNotification(_)) => {
                NotificationMetrics::record_malformed(provider);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        // The limit covers the bytes sent on the wire, framing included.
        let max_length = self.handler.payload_max_length();
        if packed.len() > max_length {
            NotificationMetrics::record_malformed(provider);
            return Err(PushError::MalformedNotification(format!(
                "Payload of {} bytes exceeds the {} limit of {} bytes",
                packed.len(),
                provider,
                max_length
            )));
        }
        let custom_data = self.handler.custom_notification_data(&batch);

        let notification = Notification::new(
            wire_id,
            provider,
            batch.message_id(),
            packed,
            batch.recipients.to_vec(),
            custom_data,
        );
        NotificationMetrics::record_built(provider);

        tracing::debug!(
            provider = %provider,
            message_id = %batch.message_id(),
            notification_id = %notification.id(),
            batch = batch.index,
            recipients = batch.recipients.len(),
            "Notification built"
        );
        Ok(notification)
    }
}

impl Iterator for NotificationBatches<'_> {
    type Item = Result<Notification>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, recipients) = self.chunks.next()?;
        let batch = MessageBatch {
            message: self.message,
            recipients,
            index,
        };
        Some(self.build(batch))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ApnsMessage, GcmMessage, MpnsMessage, MpnsToast};
    use crate::notification::payload::Payload;
    use serde_json::json;
    use std::collections::HashSet;

    const TOKEN: &str = "4efa148eb41f2e7103f21410bf48346c1afa148eb41f2e7103f21410bf48346c";

    fn gcm_message(recipients: usize) -> Message {
        let mut message = Message::new(GcmMessage::new().payload_data(json!({"k": "v"})));
        for i in 0..recipients {
            message.add_recipient(format!("device{}", i)).unwrap();
        }
        message
    }

    /// GCM handler whose body does not grow with the recipient list.
    struct CompactGcm;

    impl PayloadHandler for CompactGcm {
        fn provider(&self) -> Provider {
            Provider::Gcm
        }

        fn create_payload(&self, batch: &MessageBatch<'_>) -> Result<Payload> {
            Ok(Payload::Json(json!({"count": batch.recipients.len()})))
        }
    }

    fn compact_builder() -> NotificationBuilder {
        let mut builder = NotificationBuilder::new();
        builder.register(Arc::new(CompactGcm));
        builder
    }

    #[test]
    fn test_batch_count_is_ceiling() {
        let builder = NotificationBuilder::new();
        for (recipients, expected) in [(0, 0), (1, 1), (999, 1), (1000, 1), (1001, 2), (2500, 3)] {
            let message = gcm_message(recipients);
            let results: Vec<Result<Notification>> =
                builder.build_notifications(&message).unwrap().collect();
            assert_eq!(results.len(), expected, "recipients = {}", recipients);
            for result in &results {
                match result {
                    Ok(notification) => assert!(notification.recipients().len() <= 1000),
                    Err(e) => assert!(matches!(e, PushError::MalformedNotification(_))),
                }
            }
        }
    }

    #[test]
    fn test_batches_cover_all_recipients_once() {
        let builder = compact_builder();
        let message = gcm_message(2345);
        let mut seen = HashSet::new();
        let mut batches = 0;
        for notification in builder.build_notifications(&message).unwrap() {
            batches += 1;
            for recipient in notification.unwrap().recipients() {
                assert!(seen.insert(recipient.identifier().to_string()));
            }
        }
        assert_eq!(batches, 3);
        assert_eq!(seen.len(), 2345);
    }

    #[test]
    fn test_gcm_limit_covers_registration_ids() {
        let builder = NotificationBuilder::new();

        let small = gcm_message(100);
        let built: Vec<Notification> = builder
            .build_notifications(&small)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(built.len(), 1);
        assert!(built[0].payload().len() <= Provider::Gcm.payload_max_length());

        let full = gcm_message(1000);
        let results: Vec<Result<Notification>> = builder.build_notifications(&full).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(PushError::MalformedNotification(_))));
    }

    fn apns_with_alert(length: usize) -> Message {
        Message::new(ApnsMessage::new().alert("a".repeat(length)))
            .with_recipient(TOKEN)
            .unwrap()
    }

    #[test]
    fn test_apns_limit_includes_frame_header() {
        let builder = NotificationBuilder::new();
        let limit = Provider::Apns.payload_max_length();
        // 45 frame bytes plus {"aps":{"alert":""}}
        let overhead = 45 + 20;

        for packed_length in [limit - 1, limit] {
            let message = apns_with_alert(packed_length - overhead);
            let built: Vec<Notification> = builder
                .build_notifications(&message)
                .unwrap()
                .collect::<Result<_>>()
                .unwrap();
            assert_eq!(built[0].payload().len(), packed_length);
            assert!(built[0].payload().len() <= limit);
        }

        let message = apns_with_alert(limit + 1 - overhead);
        let results: Vec<Result<Notification>> = builder.build_notifications(&message).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(PushError::MalformedNotification(_))));
    }

    #[test]
    fn test_single_recipient_providers() {
        let builder = NotificationBuilder::new();
        let mut message = Message::new(MpnsMessage::toast(MpnsToast::default()));
        message.add_recipient("dGVzdA==").unwrap();
        message.add_recipient("dGVzdDI=").unwrap();
        message.add_recipient("dGVzdDM=").unwrap();

        let built: Vec<Notification> = builder
            .build_notifications(&message)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(built.len(), 3);
        assert_eq!(built[1].custom_value("message_type"), Some("toast"));
        assert_eq!(built[1].custom_value("delay_interval"), Some("2"));
    }

    #[test]
    fn test_wire_ids_and_notification_ids_unique() {
        let builder = NotificationBuilder::new();
        let mut message = Message::new(ApnsMessage::new().alert("hi"));
        message.add_recipient(TOKEN).unwrap();
        message.add_recipient(TOKEN.to_uppercase()).unwrap();

        let built: Vec<Notification> = builder
            .build_notifications(&message)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(built.len(), 2);
        assert_ne!(built[0].id(), built[1].id());
        assert_ne!(built[0].wire_id(), built[1].wire_id());
        assert_eq!(built[0].payload()[0], 1);
    }

    struct OversizedFirstBatch;

    impl PayloadHandler for OversizedFirstBatch {
        fn provider(&self) -> Provider {
            Provider::Gcm
        }

        fn create_payload(&self, batch: &MessageBatch<'_>) -> Result<Payload> {
            let filler = if batch.index == 0 { "x".repeat(5000) } else { String::new() };
            Ok(Payload::Json(json!({"filler": filler})))
        }
    }

    #[test]
    fn test_oversized_batch_is_malformed_and_siblings_continue() {
        let mut builder = NotificationBuilder::new();
        builder.register(Arc::new(OversizedFirstBatch));
        let message = gcm_message(1500);

        let results: Vec<Result<Notification>> = builder.build_notifications(&message).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(PushError::MalformedNotification(_))));
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.recipients().len(), 500);
        assert!(second.payload().len() <= Provider::Gcm.payload_max_length());
    }

    #[test]
    fn test_missing_handler_is_domain_error() {
        let builder = NotificationBuilder::empty();
        let message = gcm_message(1);
        assert!(matches!(
            builder.build_notifications(&message),
            Err(PushError::Domain(_))
        ));
    }

    #[test]
    fn test_invalid_content_rejected_before_building() {
        let builder = NotificationBuilder::new();
        let message = Message::new(ApnsMessage::new().priority(7)).with_recipient(TOKEN).unwrap();
        assert!(matches!(
            builder.build_notifications(&message),
            Err(PushError::InvalidArgument(_))
        ));
    }
}
