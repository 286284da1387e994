use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use super::response::ERROR_RESPONSE_LENGTH;
use crate::error::{PushError, Result};
use crate::infrastructure::transport::{BackoffConfig, ExponentialBackoff, SocketTransport};
use crate::notification::Notification;
use crate::provider::Provider;
use crate::service::{ProviderResponse, ServiceClient};

/// Connect, retrying with backoff. No-op while the socket is alive.
async fn ensure_connected<S: SocketTransport>(socket: &mut S, backoff: &BackoffConfig) -> Result<()> {
    if socket.is_alive() {
        return Ok(());
    }

    let mut backoff = ExponentialBackoff::new(backoff.clone());
    let mut last_error = None;
    while let Some(delay) = backoff.next_delay() {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match socket.connect().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    attempt = backoff.attempt(),
                    error = %e,
                    "APNS connection attempt failed"
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| PushError::Client("No connection attempts allowed".into())))
}

/// Sends frames over a persistent gateway connection.
///
/// The gateway answers only on failure, with a 6-byte error packet, and
/// closes the connection afterwards.
pub struct ApnsServiceClient<S: SocketTransport> {
    socket: Mutex<S>,
    backoff: BackoffConfig,
    failed: AtomicBool,
}

impl<S: SocketTransport> ApnsServiceClient<S> {
    pub fn new(socket: S, reconnect_attempts: u32) -> Self {
        Self {
            socket: Mutex::new(socket),
            backoff: BackoffConfig::default().with_max_attempts(reconnect_attempts.max(1)),
            failed: AtomicBool::new(false),
        }
    }

    async fn exchange(&self, socket: &mut S, frame: &[u8]) -> Result<Option<Bytes>> {
        ensure_connected(socket, &self.backoff).await?;
        socket.write(frame).await?;
        let packet = socket.read(ERROR_RESPONSE_LENGTH).await?;
        if packet.is_some() {
            socket.disconnect().await;
        }
        Ok(packet)
    }
}

#[async_trait]
impl<S: SocketTransport> ServiceClient for ApnsServiceClient<S> {
    fn provider(&self) -> Provider {
        Provider::Apns
    }

    fn is_alive(&self) -> bool {
        !self.failed.load(Ordering::Relaxed)
    }

    async fn send_request(&self, notification: &Notification) -> Result<ProviderResponse> {
        let mut socket = self.socket.lock().await;
        match self.exchange(&mut socket, notification.payload()).await {
            Ok(packet) => Ok(ProviderResponse::Apns {
                packet,
                recipients: notification.recipients().to_vec(),
            }),
            Err(e) => {
                self.failed.store(true, Ordering::Relaxed);
                socket.disconnect().await;
                Err(e)
            }
        }
    }
}

/// Reads the stale-token stream from the feedback service.
pub struct ApnsFeedbackClient<S: SocketTransport> {
    socket: Mutex<S>,
    backoff: BackoffConfig,
}

impl<S: SocketTransport> ApnsFeedbackClient<S> {
    pub fn new(socket: S, reconnect_attempts: u32) -> Self {
        Self {
            socket: Mutex::new(socket),
            backoff: BackoffConfig::default().with_max_attempts(reconnect_attempts.max(1)),
        }
    }
}

#[async_trait]
impl<S: SocketTransport> ServiceClient for ApnsFeedbackClient<S> {
    fn provider(&self) -> Provider {
        Provider::Apns
    }

    fn is_alive(&self) -> bool {
        true
    }

    async fn send_request(&self, _notification: &Notification) -> Result<ProviderResponse> {
        Err(PushError::Domain(
            "The APNS feedback service does not accept notifications".into(),
        ))
    }

    async fn receive_feedback(&self) -> Result<ProviderResponse> {
        let mut socket = self.socket.lock().await;
        ensure_connected(&mut *socket, &self.backoff).await?;
        let data = socket.read_to_end().await;
        socket.disconnect().await;
        let data = data?;

        tracing::debug!(bytes = data.len(), "Received APNS feedback");
        Ok(ProviderResponse::Feedback {
            provider: Provider::Apns,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ApnsMessage, Message};
    use crate::notification::NotificationBuilder;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    const TOKEN: &str = "4efa148eb41f2e7103f21410bf48346c1afa148eb41f2e7103f21410bf48346c";

    #[derive(Default)]
    struct Shared {
        connects: usize,
        fail_connects: usize,
        written: Vec<Vec<u8>>,
        replies: VecDeque<Option<Bytes>>,
        feedback: Bytes,
    }

    struct ScriptedSocket {
        shared: Arc<StdMutex<Shared>>,
        connected: bool,
    }

    #[async_trait]
    impl SocketTransport for ScriptedSocket {
        async fn connect(&mut self) -> Result<()> {
            let mut shared = self.shared.lock().unwrap();
            shared.connects += 1;
            if shared.fail_connects > 0 {
                shared.fail_connects -= 1;
                return Err(PushError::Client("refused".into()));
            }
            self.connected = true;
            Ok(())
        }

        async fn write(&mut self, data: &[u8]) -> Result<()> {
            self.shared.lock().unwrap().written.push(data.to_vec());
            Ok(())
        }

        async fn read(&mut self, _max_length: usize) -> Result<Option<Bytes>> {
            Ok(self.shared.lock().unwrap().replies.pop_front().flatten())
        }

        async fn read_to_end(&mut self) -> Result<Bytes> {
            Ok(self.shared.lock().unwrap().feedback.clone())
        }

        fn is_alive(&self) -> bool {
            self.connected
        }

        async fn disconnect(&mut self) {
            self.connected = false;
        }
    }

    fn socket(shared: &Arc<StdMutex<Shared>>) -> ScriptedSocket {
        ScriptedSocket {
            shared: shared.clone(),
            connected: false,
        }
    }

    fn notification() -> Notification {
        let message = Message::new(ApnsMessage::new().alert("hi")).with_recipient(TOKEN).unwrap();
        NotificationBuilder::new()
            .build_notifications(&message)
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_connection_reused_between_sends() {
        let shared = Arc::new(StdMutex::new(Shared::default()));
        let client = ApnsServiceClient::new(socket(&shared), 3);
        let notification = notification();

        for _ in 0..3 {
            let response = client.send_request(&notification).await.unwrap();
            assert!(response.parse().is_success());
        }

        let shared = shared.lock().unwrap();
        assert_eq!(shared.connects, 1);
        assert_eq!(shared.written.len(), 3);
        assert_eq!(shared.written[0], notification.payload().to_vec());
    }

    #[tokio::test]
    async fn test_reconnects_after_error_packet() {
        let shared = Arc::new(StdMutex::new(Shared::default()));
        shared
            .lock()
            .unwrap()
            .replies
            .push_back(Some(Bytes::from_static(&[8, 7, 0, 0, 0, 1])));
        let client = ApnsServiceClient::new(socket(&shared), 3);
        let notification = notification();

        let first = client.send_request(&notification).await.unwrap();
        assert_eq!(first.parse().error_code(), Some(7));
        assert!(client.is_alive());

        client.send_request(&notification).await.unwrap();
        assert_eq!(shared.lock().unwrap().connects, 2);
    }

    #[tokio::test]
    async fn test_connect_retries_then_fails() {
        let shared = Arc::new(StdMutex::new(Shared {
            fail_connects: 5,
            ..Default::default()
        }));
        let client = ApnsServiceClient::new(socket(&shared), 2);

        assert!(client.send_request(&notification()).await.is_err());
        assert!(!client.is_alive());
        assert_eq!(shared.lock().unwrap().connects, 2);
    }

    #[tokio::test]
    async fn test_feedback_client_reads_stream() {
        let shared = Arc::new(StdMutex::new(Shared {
            feedback: Bytes::from_static(b"stream"),
            ..Default::default()
        }));
        let client = ApnsFeedbackClient::new(socket(&shared), 1);

        match client.receive_feedback().await.unwrap() {
            ProviderResponse::Feedback { data, .. } => assert_eq!(&data[..], b"stream"),
            other => panic!("unexpected response {:?}", other),
        }
        assert!(client.send_request(&notification()).await.is_err());
    }
}
