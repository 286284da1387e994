use serde::Deserialize;

use crate::message::RecipientDevice;
use crate::service::ResponseOutcome;

const SUCCESS: u16 = 200;
const MALFORMED_NOTIFICATION: u16 = 400;
const AUTHENTICATION_ERROR: u16 = 401;
/// Recorded when GCM accepted the request but delivered nothing, or failed
/// some recipients without flagging them. Not an HTTP status.
const UNPROCESSED_MESSAGES: u16 = 0;

#[derive(Debug, Deserialize)]
struct GcmResponseBody {
    #[serde(default)]
    success: u64,
    #[serde(default)]
    failure: u64,
    #[serde(default)]
    results: Vec<GcmResult>,
}

/// Per-recipient entry, in request order.
#[derive(Debug, Deserialize)]
struct GcmResult {
    registration_id: Option<String>,
    error: Option<String>,
}

pub(crate) fn parse_response(
    status: u16,
    body: &[u8],
    mut recipients: Vec<RecipientDevice>,
) -> ResponseOutcome {
    match status {
        SUCCESS => {}
        MALFORMED_NOTIFICATION => {
            return ResponseOutcome::Malformed {
                code: status,
                description: "The request could not be parsed as JSON, or it contained invalid fields"
                    .into(),
            }
        }
        AUTHENTICATION_ERROR => {
            return ResponseOutcome::DispatchError {
                code: status,
                description: "There was an error authenticating the sender account".into(),
            }
        }
        other => {
            return ResponseOutcome::ProtocolViolation {
                description: format!("Unknown error occurred while sending notification (HTTP {})", other),
            }
        }
    }

    let body: GcmResponseBody = match serde_json::from_slice(body) {
        Ok(body) => body,
        Err(e) => {
            return ResponseOutcome::ProtocolViolation {
                description: format!("Unable to decode GCM response body: {}", e),
            }
        }
    };

    let mut flagged = false;
    for (recipient, result) in recipients.iter_mut().zip(&body.results) {
        if let Some(replacement) = &result.registration_id {
            flagged |= recipient.replace_with(replacement.clone());
            continue;
        }
        match result.error.as_deref() {
            Some("InvalidRegistration") | Some("NotRegistered") => {
                flagged |= recipient.mark_not_registered();
            }
            Some("Unavailable") => {
                flagged |= recipient.mark_not_ready();
            }
            Some(other) => {
                tracing::debug!(
                    recipient = %recipient,
                    error = other,
                    "GCM reported an error for recipient"
                );
            }
            None => {}
        }
    }

    if flagged {
        return ResponseOutcome::InvalidRecipients { recipients };
    }

    if body.success == 0 || body.failure > 0 {
        return ResponseOutcome::DispatchError {
            code: UNPROCESSED_MESSAGES,
            description: format!("{} messages could not be processed", body.failure),
        };
    }

    ResponseOutcome::Success
}
