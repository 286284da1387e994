//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    INVALID_RECIPIENTS_TOTAL, MESSAGE_ERRORS_TOTAL, NOTIFICATIONS_BUILT_TOTAL,
    NOTIFICATIONS_FAILED_TOTAL, NOTIFICATIONS_MALFORMED_TOTAL, NOTIFICATIONS_SENT_TOTAL,
    SEND_LATENCY,
};
use crate::provider::Provider;

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording build and delivery metrics
pub struct NotificationMetrics;

impl NotificationMetrics {
    pub fn record_built(provider: Provider) {
        NOTIFICATIONS_BUILT_TOTAL
            .with_label_values(&[provider.config_key()])
            .inc();
    }

    pub fn record_malformed(provider: Provider) {
        NOTIFICATIONS_MALFORMED_TOTAL
            .with_label_values(&[provider.config_key()])
            .inc();
    }

    /// Record a notification sent, with the time spent on the round trip
    pub fn record_sent(provider: Provider, elapsed: Duration) {
        NOTIFICATIONS_SENT_TOTAL
            .with_label_values(&[provider.config_key()])
            .inc();
        SEND_LATENCY
            .with_label_values(&[provider.config_key()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_failed(provider: Provider) {
        NOTIFICATIONS_FAILED_TOTAL
            .with_label_values(&[provider.config_key()])
            .inc();
    }
}

/// Helper struct for recording parsed response outcomes
pub struct ResponseMetrics;

impl ResponseMetrics {
    pub fn record_invalid_recipients(provider: Provider, count: usize) {
        INVALID_RECIPIENTS_TOTAL
            .with_label_values(&[provider.config_key()])
            .inc_by(count as u64);
    }

    /// `kind` is one of `dispatch`, `malformed` or `runtime`
    pub fn record_message_error(provider: Provider, kind: &str) {
        MESSAGE_ERRORS_TOTAL
            .with_label_values(&[provider.config_key(), kind])
            .inc();
    }
}
