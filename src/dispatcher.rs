use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::Settings;
use crate::error::{PushError, Result};
use crate::message::{Message, MessageCollection, RecipientDevice};
use crate::metrics::NotificationMetrics;
use crate::notification::{Notification, NotificationBuilder};
use crate::provider::Provider;
use crate::service::{
    Application, DefaultServiceClientFactory, ResponseHandler, ResponseOutcome, ServiceClient,
    ServiceClientFactory,
};

/// Error code recorded for batches rejected at build time.
const MALFORMED_ERROR_CODE: u16 = 400;

/// Result of dispatching one message.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub message_id: String,
    pub provider: Provider,
    /// Notifications built (malformed batches excluded)
    pub notifications: usize,
    /// Notifications the transport accepted
    pub sent: usize,
    /// Notifications lost to transport failures
    pub failed: usize,
    /// Batches rejected at build time
    pub malformed: usize,
    /// Recipients flagged by the provider while sending this message
    pub invalid_recipients: Vec<RecipientDevice>,
    /// Last error code recorded for this message
    pub error_code: Option<u16>,
}

impl DispatchReport {
    fn new(message: &Message) -> Self {
        Self {
            message_id: message.id().to_string(),
            provider: message.provider(),
            notifications: 0,
            sent: 0,
            failed: 0,
            malformed: 0,
            invalid_recipients: Vec::new(),
            error_code: None,
        }
    }

    /// True when every batch was built, sent and accepted.
    pub fn is_success(&self) -> bool {
        self.failed == 0
            && self.malformed == 0
            && self.invalid_recipients.is_empty()
            && self.error_code.is_none()
    }

    fn record(&mut self, outcome: &ResponseOutcome) {
        self.invalid_recipients
            .extend(outcome.flagged_recipients().cloned());
        if let Some(code) = outcome.error_code() {
            self.error_code = Some(code);
        }
    }
}

/// Statistics for the dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Messages dispatched
    pub messages: AtomicU64,
    /// Notifications accepted by a transport
    pub notifications_sent: AtomicU64,
    /// Notifications lost to transport failures
    pub notifications_failed: AtomicU64,
    /// Batches rejected at build time
    pub malformed_batches: AtomicU64,
    /// Stale tokens received from feedback services
    pub feedback_tokens: AtomicU64,
    /// Service clients created, including re-creations
    pub clients_created: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            messages: self.messages.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            malformed_batches: self.malformed_batches.load(Ordering::Relaxed),
            feedback_tokens: self.feedback_tokens.load(Ordering::Relaxed),
            clients_created: self.clients_created.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub messages: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub malformed_batches: u64,
    pub feedback_tokens: u64,
    pub clients_created: u64,
}

/// Builds notifications for messages and sends them over per-provider clients.
///
/// One client per provider is created lazily and reused until it reports
/// that its transport is dead. Responses are folded into a shared
/// [`ResponseHandler`]; each response is applied under its lock.
pub struct Dispatcher {
    builder: NotificationBuilder,
    factory: Arc<dyn ServiceClientFactory>,
    clients: DashMap<Provider, Arc<dyn ServiceClient>>,
    responses: Mutex<ResponseHandler>,
    stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(factory: Arc<dyn ServiceClientFactory>) -> Self {
        Self::with_builder(factory, NotificationBuilder::new())
    }

    pub fn with_builder(factory: Arc<dyn ServiceClientFactory>, builder: NotificationBuilder) -> Self {
        Self {
            builder,
            factory,
            clients: DashMap::new(),
            responses: Mutex::new(ResponseHandler::new()),
            stats: DispatcherStats::default(),
        }
    }

    /// Create a dispatcher for the configured application.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let application = Application::from_settings(settings)?;
        tracing::info!(
            application = %application.name(),
            services = ?application.initialized_services(),
            "Dispatcher configured"
        );
        let factory = DefaultServiceClientFactory::new(Arc::new(application), settings.transport.clone());
        Ok(Self::new(Arc::new(factory)))
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Pooled client for a provider, recreated when its transport died.
    fn client(&self, provider: Provider) -> Result<Arc<dyn ServiceClient>> {
        if let Some(client) = self.clients.get(&provider) {
            if client.is_alive() {
                return Ok(Arc::clone(client.value()));
            }
            tracing::info!(provider = %provider, "Service client is not alive, recreating");
        }

        let client = self.factory.create_service_client(provider, false)?;
        self.stats.clients_created.fetch_add(1, Ordering::Relaxed);
        self.clients.insert(provider, Arc::clone(&client));
        Ok(client)
    }

    /// Build and send every notification of a message.
    ///
    /// Configuration, argument and domain errors abort the message. Batches
    /// that fail to build or send are counted in the report and do not stop
    /// the remaining batches.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, message),
        fields(
            message_id = %message.id(),
            provider = %message.provider(),
            recipients = message.recipients().len()
        )
    )]
    pub async fn dispatch(&self, message: &Message) -> Result<DispatchReport> {
        let mut report = DispatchReport::new(message);
        self.stats.messages.fetch_add(1, Ordering::Relaxed);

        for built in self.builder.build_notifications(message)? {
            let notification = match built {
                Ok(notification) => notification,
                Err(PushError::MalformedNotification(reason)) => {
                    tracing::error!(message_id = %message.id(), "Malformed notification: {}", reason);
                    self.stats.malformed_batches.fetch_add(1, Ordering::Relaxed);
                    self.responses
                        .lock()
                        .await
                        .record_message_error(message.id(), MALFORMED_ERROR_CODE);
                    report.malformed += 1;
                    report.error_code = Some(MALFORMED_ERROR_CODE);
                    continue;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(message_id = %message.id(), error = %e, "Failed to build notification");
                    report.failed += 1;
                    continue;
                }
            };

            report.notifications += 1;
            let client = self.client(notification.provider())?;
            match self.deliver(client.as_ref(), &notification).await {
                Some(outcome) => {
                    report.sent += 1;
                    report.record(&outcome);
                }
                None => report.failed += 1,
            }
        }

        tracing::info!(
            message_id = %report.message_id,
            notifications = report.notifications,
            sent = report.sent,
            failed = report.failed,
            malformed = report.malformed,
            invalid_recipients = report.invalid_recipients.len(),
            "Message dispatched"
        );
        Ok(report)
    }

    /// Send one notification over the pooled client for its provider.
    ///
    /// Returns whether the transport accepted it. The provider's answer is
    /// folded into the response aggregates either way it turns out.
    pub async fn send_notification(&self, notification: &Notification) -> Result<bool> {
        let client = self.client(notification.provider())?;
        Ok(self.deliver(client.as_ref(), notification).await.is_some())
    }

    async fn deliver(&self, client: &dyn ServiceClient, notification: &Notification) -> Option<ResponseOutcome> {
        let provider = notification.provider();
        let started = Instant::now();

        let response = match client.send_request(notification).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    provider = %provider,
                    message_id = %notification.message_id(),
                    notification_id = %notification.id(),
                    error = %e,
                    "Failed to send notification"
                );
                NotificationMetrics::record_failed(provider);
                self.stats.notifications_failed.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        NotificationMetrics::record_sent(provider, started.elapsed());
        self.stats.notifications_sent.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            provider = %provider,
            message_id = %notification.message_id(),
            notification_id = %notification.id(),
            "Notification sent"
        );

        let outcome = self
            .responses
            .lock()
            .await
            .handle_response(Some(notification.message_id()), response);
        Some(outcome)
    }

    /// Dispatch every message of a collection.
    ///
    /// Providers run concurrently; messages of one provider go one after the
    /// other over the shared client. Results keep the collection's order.
    #[tracing::instrument(name = "dispatcher.dispatch_all", skip(self, messages), fields(messages = messages.len()))]
    pub async fn dispatch_all(&self, messages: &MessageCollection) -> Vec<Result<DispatchReport>> {
        let mut groups: BTreeMap<Provider, Vec<(usize, &Message)>> = BTreeMap::new();
        for (index, message) in messages.iter().enumerate() {
            groups.entry(message.provider()).or_default().push((index, message));
        }

        let runs = groups.into_values().map(|group| async move {
            let mut results = Vec::with_capacity(group.len());
            for (index, message) in group {
                results.push((index, self.dispatch(message).await));
            }
            results
        });

        let mut results: Vec<(usize, Result<DispatchReport>)> =
            join_all(runs).await.into_iter().flatten().collect();
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// Read a provider's stale-token feedback into the invalid-recipient report.
    ///
    /// Returns the number of flagged recipients. Transport failures are logged
    /// and yield zero.
    #[tracing::instrument(name = "dispatcher.load_feedback", skip(self))]
    pub async fn load_feedback(&self, provider: Provider) -> Result<usize> {
        if !provider.has_feedback() {
            return Err(PushError::Domain(format!(
                "{} does not provide a feedback service",
                provider
            )));
        }

        let client = self.factory.create_service_client(provider, true)?;
        let response = match client.receive_feedback().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Failed to load feedback");
                return Ok(0);
            }
        };

        let outcome = self.responses.lock().await.handle_response(None, response);
        let flagged = outcome.flagged_recipients().count();
        self.stats
            .feedback_tokens
            .fetch_add(flagged as u64, Ordering::Relaxed);
        tracing::info!(provider = %provider, tokens = flagged, "Feedback loaded");
        Ok(flagged)
    }

    /// Recipients flagged since the last [`Dispatcher::reset_responses`].
    pub async fn invalid_recipients(&self) -> Vec<RecipientDevice> {
        self.responses.lock().await.invalid_recipients().to_vec()
    }

    /// Error code per message identifier.
    pub async fn message_errors(&self) -> HashMap<String, u16> {
        self.responses.lock().await.message_errors().clone()
    }

    pub async fn reset_responses(&self) {
        self.responses.lock().await.reset();
    }
}
