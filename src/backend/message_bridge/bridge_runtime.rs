use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

use crate::backend::command_dispatch::PanelDispatcher;
use crate::backend::common::dtos::{InboundMessage, OutboundMessage};

const NOTIFICATION_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("panel host channel is closed")]
    ChannelClosed,
    #[error("{command} got no response within {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },
    #[error("{0}")]
    Rejected(String),
    #[error("panel host dropped the request without responding")]
    ResponseDropped,
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("failed to encode payload: {0}")]
    Encode(String),
}

/// Host-initiated messages that are not responses to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelNotification {
    RefreshFileTree,
}

type PendingResolver = oneshot::Sender<Result<Value, String>>;

struct BridgeInner {
    outbound: mpsc::UnboundedSender<InboundMessage>,
    pending: Mutex<HashMap<String, PendingResolver>>,
    request_timeout: Option<Duration>,
    notifications: broadcast::Sender<PanelNotification>,
}

impl BridgeInner {
    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingResolver>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops the pending entry however the request ends, including when the
/// caller abandons the future.
struct PendingGuard<'a> {
    inner: &'a BridgeInner,
    request_id: String,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.inner.pending().remove(&self.request_id);
    }
}

/// UI-side request/response correlator. Cloning shares the pending registry.
#[derive(Clone)]
pub struct PanelBridge {
    inner: Arc<BridgeInner>,
}

impl PanelBridge {
    pub fn new(
        outbound: mpsc::UnboundedSender<InboundMessage>,
        request_timeout: Option<Duration>,
    ) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            inner: Arc::new(BridgeInner {
                outbound,
                pending: Mutex::new(HashMap::new()),
                request_timeout,
                notifications,
            }),
        }
    }

    /// Bridge wired straight to `dispatcher`; each request runs on its own task.
    pub fn connect_in_process(dispatcher: Arc<PanelDispatcher>) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<InboundMessage>();
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<OutboundMessage>();
        let bridge = Self::new(request_tx, dispatcher.settings().bridge_request_timeout());

        tokio::spawn(async move {
            while let Some(message) = request_rx.recv().await {
                let dispatcher = dispatcher.clone();
                let sink = response_tx.clone();
                tokio::spawn(async move {
                    dispatcher.handle_message(message, &sink).await;
                });
            }
            tracing::debug!("panel bridge request pump stopped");
        });

        let weak: Weak<BridgeInner> = Arc::downgrade(&bridge.inner);
        tokio::spawn(async move {
            while let Some(message) = response_rx.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                PanelBridge { inner }.handle_message(message);
            }
            tracing::debug!("panel bridge response pump stopped");
        });

        bridge
    }

    pub async fn request(&self, command: &str, payload: Value) -> Result<Value, BridgeError> {
        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();

        self.inner.pending().insert(request_id.clone(), tx);
        let _guard = PendingGuard {
            inner: &self.inner,
            request_id: request_id.clone(),
        };

        let message = InboundMessage {
            command: command.to_string(),
            payload,
            request_id: request_id.clone(),
        };
        if self.inner.outbound.send(message).is_err() {
            return Err(BridgeError::ChannelClosed);
        }

        let settled = match self.inner.request_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(settled) => settled,
                Err(_) => {
                    tracing::warn!(%command, %request_id, "panel request timed out");
                    return Err(BridgeError::Timeout {
                        command: command.to_string(),
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            },
            None => rx.await,
        };

        match settled {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(BridgeError::Rejected(message)),
            Err(_) => Err(BridgeError::ResponseDropped),
        }
    }

    pub async fn request_as<R: DeserializeOwned>(
        &self,
        command: &str,
        payload: impl Serialize,
    ) -> Result<R, BridgeError> {
        let payload =
            serde_json::to_value(payload).map_err(|error| BridgeError::Encode(error.to_string()))?;
        let value = self.request(command, payload).await?;
        serde_json::from_value(value).map_err(|error| BridgeError::Decode(error.to_string()))
    }

    /// Feeds one host message into the bridge. Returns `true` when it settled
    /// a pending request.
    pub fn handle_message(&self, message: OutboundMessage) -> bool {
        match message {
            OutboundMessage::Response {
                request_id,
                payload,
                error,
            } => {
                let Some(resolver) = self.inner.pending().remove(&request_id) else {
                    tracing::debug!(%request_id, "dropping response for unknown request");
                    return false;
                };
                let outcome = match error {
                    Some(message) => Err(message),
                    None => Ok(payload),
                };
                resolver.send(outcome).is_ok()
            }
            OutboundMessage::RefreshFileTree => {
                let _ = self
                    .inner
                    .notifications
                    .send(PanelNotification::RefreshFileTree);
                false
            }
        }
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<PanelNotification> {
        self.inner.notifications.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending().len()
    }
}
