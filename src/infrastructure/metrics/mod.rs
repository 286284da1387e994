//! Prometheus metrics for notification dispatch.
//!
//! - Build metrics (notifications built, malformed batches)
//! - Delivery metrics (sent, failed, send latency)
//! - Response metrics (invalid recipients, message errors)

mod helpers;

pub use helpers::{encode_metrics, NotificationMetrics, ResponseMetrics};

use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "unified_push";

lazy_static! {
    // ============================================================================
    // Build Metrics
    // ============================================================================

    /// Notifications built per provider
    pub static ref NOTIFICATIONS_BUILT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_built_total", METRIC_PREFIX),
        "Total notifications built",
        &["provider"]
    ).unwrap();

    /// Batches rejected at build time for exceeding the payload limit
    pub static ref NOTIFICATIONS_MALFORMED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_malformed_total", METRIC_PREFIX),
        "Total batches rejected as malformed at build time",
        &["provider"]
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    pub static ref NOTIFICATIONS_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_sent_total", METRIC_PREFIX),
        "Total notifications handed to a provider",
        &["provider"]
    ).unwrap();

    /// Notifications that failed at the transport level
    pub static ref NOTIFICATIONS_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_failed_total", METRIC_PREFIX),
        "Total notifications that could not be sent",
        &["provider"]
    ).unwrap();

    pub static ref SEND_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_send_latency_seconds", METRIC_PREFIX),
        "Time to send one notification and receive its response",
        &["provider"],
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Response Metrics
    // ============================================================================

    /// Recipients flagged by providers (stale, unregistered, replaced)
    pub static ref INVALID_RECIPIENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_invalid_recipients_total", METRIC_PREFIX),
        "Total recipients flagged invalid by providers",
        &["provider"]
    ).unwrap();

    pub static ref MESSAGE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_message_errors_total", METRIC_PREFIX),
        "Total provider responses reporting an error",
        &["provider", "kind"]
    ).unwrap();
}
