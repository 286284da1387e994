//! APNS feedback service stream.
//!
//! The stream is a sequence of fixed-size tuples:
//! timestamp (u32 BE) | token length (u16 BE) | token (32 bytes).

use bytes::Buf;
use chrono::{DateTime, Utc};

use crate::message::RecipientDevice;
use crate::provider::Provider;
use crate::service::ResponseOutcome;

const TUPLE_LENGTH: usize = 4 + 2 + 32;

/// A device the feedback service reported as no longer reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackTuple {
    /// When the service determined the app was gone from the device
    pub timestamp: DateTime<Utc>,
    /// Hex-encoded device token
    pub token: String,
}

/// Split a feedback stream into tuples. A trailing partial tuple is dropped.
pub fn parse_feedback_tuples(data: &[u8]) -> Vec<FeedbackTuple> {
    let mut tuples = Vec::with_capacity(data.len() / TUPLE_LENGTH);
    let mut chunks = data.chunks_exact(TUPLE_LENGTH);

    for mut chunk in chunks.by_ref() {
        let timestamp = chunk.get_u32();
        let length = usize::from(chunk.get_u16());
        let token = &chunk[..length.min(chunk.len())];
        tuples.push(FeedbackTuple {
            timestamp: DateTime::from_timestamp(i64::from(timestamp), 0).unwrap_or_default(),
            token: hex::encode(token),
        });
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        tracing::warn!(
            bytes = remainder.len(),
            "Ignoring incomplete tuple at end of feedback stream"
        );
    }
    tuples
}

pub(crate) fn parse_feedback(data: &[u8]) -> ResponseOutcome {
    let mut recipients = Vec::new();
    for tuple in parse_feedback_tuples(data) {
        match RecipientDevice::new(Provider::Apns, tuple.token.as_str()) {
            Ok(mut device) => {
                device.mark_not_registered();
                recipients.push(device);
            }
            Err(e) => {
                tracing::warn!(token = %tuple.token, error = %e, "Skipping malformed feedback token");
            }
        }
    }

    if recipients.is_empty() {
        ResponseOutcome::Success
    } else {
        ResponseOutcome::InvalidRecipients { recipients }
    }
}
