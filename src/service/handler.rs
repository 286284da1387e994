use std::collections::HashMap;

use crate::error::{PushError, Result};
use crate::message::RecipientDevice;
use crate::metrics::ResponseMetrics;
use crate::service::{ProviderResponse, ResponseOutcome};

#[derive(Debug)]
struct PendingResponse {
    message_id: Option<String>,
    response: ProviderResponse,
}

/// Collects provider responses and aggregates their outcomes.
///
/// Flagged recipients and per-message error codes accumulate across calls
/// until [`ResponseHandler::reset`].
#[derive(Debug, Default)]
pub struct ResponseHandler {
    pending: Vec<PendingResponse>,
    invalid_recipients: Vec<RecipientDevice>,
    message_errors: HashMap<String, u16>,
}

impl ResponseHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_response(&mut self, response: ProviderResponse) -> &mut Self {
        self.pending.push(PendingResponse {
            message_id: None,
            response,
        });
        self
    }

    /// Register a response for a message. The identifier must not be empty.
    pub fn add_identified_response(
        &mut self,
        message_id: impl Into<String>,
        response: ProviderResponse,
    ) -> Result<&mut Self> {
        let message_id = message_id.into();
        if message_id.is_empty() {
            return Err(PushError::invalid_argument("Message identifier is required"));
        }
        self.pending.push(PendingResponse {
            message_id: Some(message_id),
            response,
        });
        Ok(self)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Parse every registered response once, draining the collection.
    pub fn handle_response_collection(&mut self) -> Vec<ResponseOutcome> {
        let pending = std::mem::take(&mut self.pending);
        pending
            .into_iter()
            .map(|p| self.handle_response(p.message_id.as_deref(), p.response))
            .collect()
    }

    /// Parse one response and fold its outcome into the aggregates.
    pub fn handle_response(
        &mut self,
        message_id: Option<&str>,
        response: ProviderResponse,
    ) -> ResponseOutcome {
        let provider = response.provider();
        let outcome = response.parse();

        match &outcome {
            ResponseOutcome::Success => {
                tracing::trace!(provider = %provider, message_id = ?message_id, "Response accepted");
            }
            ResponseOutcome::InvalidRecipients { .. } => {
                let flagged: Vec<RecipientDevice> = outcome.flagged_recipients().cloned().collect();
                tracing::info!(
                    provider = %provider,
                    message_id = ?message_id,
                    count = flagged.len(),
                    "Provider flagged recipients"
                );
                ResponseMetrics::record_invalid_recipients(provider, flagged.len());
                self.invalid_recipients.extend(flagged);
            }
            ResponseOutcome::DispatchError { code, description } => {
                tracing::warn!(
                    provider = %provider,
                    message_id = ?message_id,
                    code = *code,
                    "Dispatch message warning: {}",
                    description
                );
                ResponseMetrics::record_message_error(provider, outcome.kind());
                self.record(message_id, *code);
            }
            ResponseOutcome::Malformed { code, description } => {
                tracing::error!(
                    provider = %provider,
                    message_id = ?message_id,
                    code = *code,
                    "Malformed notification: {}",
                    description
                );
                ResponseMetrics::record_message_error(provider, outcome.kind());
                self.record(message_id, *code);
            }
            ResponseOutcome::ProtocolViolation { description } => {
                tracing::error!(
                    provider = %provider,
                    message_id = ?message_id,
                    "Unexpected provider response: {}",
                    description
                );
                ResponseMetrics::record_message_error(provider, outcome.kind());
            }
        }

        outcome
    }

    fn record(&mut self, message_id: Option<&str>, code: u16) {
        match message_id {
            Some(id) => self.record_message_error(id, code),
            None => tracing::debug!(code, "Error code for unidentified response not recorded"),
        }
    }

    /// Record an error code for a message. The latest code wins.
    pub fn record_message_error(&mut self, message_id: &str, code: u16) {
        self.message_errors.insert(message_id.to_string(), code);
    }

    /// Recipients flagged by any handled response.
    pub fn invalid_recipients(&self) -> &[RecipientDevice] {
        &self.invalid_recipients
    }

    /// Error code per message identifier.
    pub fn message_errors(&self) -> &HashMap<String, u16> {
        &self.message_errors
    }

    /// Forget aggregated results. Pending responses are kept.
    pub fn reset(&mut self) {
        self.invalid_recipients.clear();
        self.message_errors.clear();
    }
}
