use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::{Payload, PayloadHandler};
use crate::error::{PushError, Result};
use crate::message::{CollapseKey, MessageBatch, MessageContent};
use crate::provider::Provider;

/// Longest time-to-live GCM accepts: four weeks.
const MAX_TIME_TO_LIVE_SECS: i64 = 2_419_200;

/// Request body, serialized in field order.
#[derive(Debug, Serialize)]
struct GcmRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    collapse_key: Option<&'a CollapseKey>,
    delay_while_idle: bool,
    registration_ids: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
    time_to_live: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    restricted_package_name: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    dry_run: bool,
}

pub struct GcmPayloadHandler;

impl PayloadHandler for GcmPayloadHandler {
    fn provider(&self) -> Provider {
        Provider::Gcm
    }

    fn create_payload(&self, batch: &MessageBatch<'_>) -> Result<Payload> {
        let MessageContent::Gcm(content) = batch.content() else {
            return Err(PushError::Domain(format!(
                "GCM payload handler cannot handle {} messages",
                batch.message.provider()
            )));
        };

        let time_to_live = (batch.expiration() - Utc::now())
            .num_seconds()
            .clamp(0, MAX_TIME_TO_LIVE_SECS);

        let request = GcmRequest {
            collapse_key: content.collapse_key.as_ref(),
            delay_while_idle: content.delay_while_idle,
            registration_ids: batch.recipients.iter().map(|r| r.identifier()).collect(),
            data: content.payload_data.as_ref(),
            time_to_live,
            restricted_package_name: content.package_name.as_deref(),
            dry_run: content.dry_run,
        };

        Ok(Payload::Json(serde_json::to_value(request)?))
    }
}
