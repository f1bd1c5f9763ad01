use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use ytqf_protocol::MutationRequest;
use ytqf_protocol::MutationResult;
use ytqf_protocol::Operation;
use ytqf_protocol::ProtocolError;
use ytqf_protocol::RequestMessage;
use ytqf_protocol::ResponseMessage;

use crate::ContextOrigin;
use crate::Envelope;
use crate::MessageBus;
use crate::Subscription;

/// How long a caller waits for the privileged side to answer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const REJECTED_FALLBACK: &str = "YouTube rejected the request.";

/// Shared across every client so request ids never repeat in a process.
static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The caller supplied an incomplete request; nothing was sent.
    #[error("invalid request: {0}")]
    Validation(#[from] ProtocolError),

    #[error("{0}")]
    Timeout(String),

    /// The privileged side answered with `ok: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("request bus closed")]
    Closed,
}

type Settlement = Result<Option<MutationResult>, BusError>;

struct PendingRequest {
    operation: Operation,
    settle: oneshot::Sender<Settlement>,
}

type PendingMap = Arc<Mutex<HashMap<String, PendingRequest>>>;

/// Removes the pending entry when the awaiting call ends for any reason:
/// timeout, settle, or the caller dropping the future.
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    request_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.request_id);
    }
}

/// Restricted-context side of the relay.
///
/// Publishes correlated requests and resolves each one from the first
/// matching response, or fails it once the deadline passes. A single
/// listener task owns the response subscription for the client's lifetime.
pub struct RelayClient {
    bus: Arc<dyn MessageBus>,
    origin: ContextOrigin,
    timeout: Duration,
    pending: PendingMap,
    listener: JoinHandle<()>,
}

impl RelayClient {
    /// Subscribes to responses on `bus` and spawns the listener. Must be
    /// called from within a tokio runtime.
    pub fn start(bus: Arc<dyn MessageBus>, origin: ContextOrigin) -> Self {
        Self::with_timeout(bus, origin, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(bus: Arc<dyn MessageBus>, origin: ContextOrigin, timeout: Duration) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let subscription = bus.subscribe(Box::new(move |envelope: &Envelope| {
            envelope.origin == origin && ResponseMessage::matches(&envelope.data)
        }));
        let listener = tokio::spawn(listen(subscription, Arc::clone(&pending)));
        Self {
            bus,
            origin,
            timeout,
            pending,
            listener,
        }
    }

    pub async fn add(&self, item_id: &str, collection_id: &str) -> Settlement {
        self.send(Operation::Add, item_id, collection_id).await
    }

    pub async fn remove(&self, item_id: &str, collection_id: &str) -> Settlement {
        self.send(Operation::Remove, item_id, collection_id).await
    }

    /// Sends one mutation and waits for its correlated response.
    ///
    /// An `ok` response without a detail resolves to `Ok(None)`.
    pub async fn send(&self, operation: Operation, item_id: &str, collection_id: &str) -> Settlement {
        let request = MutationRequest::new(operation, item_id, collection_id)?;
        self.request(&request).await
    }

    pub async fn request(&self, request: &MutationRequest) -> Settlement {
        let operation = request.operation;
        let request_id = next_request_id();
        let (settle, settled) = oneshot::channel();

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id.clone(), PendingRequest { operation, settle });
        let _guard = PendingGuard {
            pending: &self.pending,
            request_id: &request_id,
        };

        tracing::debug!(%request_id, %operation, "publishing relay request");
        self.bus.publish(Envelope::new(
            self.origin,
            RequestMessage::new(request_id.as_str(), request).to_value(),
        ));

        match tokio::time::timeout(self.timeout, settled).await {
            Ok(Ok(settlement)) => settlement,
            Ok(Err(_)) => Err(BusError::Closed),
            Err(_) => {
                tracing::warn!(%request_id, %operation, "relay request timed out");
                Err(BusError::Timeout(timeout_message(operation).to_string()))
            }
        }
    }

    /// Number of requests still awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn next_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("ytqf-{}-{counter}", chrono::Utc::now().timestamp_millis())
}

fn timeout_message(operation: Operation) -> &'static str {
    match operation {
        Operation::Add => "Timed out while adding to playlist.",
        Operation::Remove => "Timed out while removing from playlist.",
    }
}

async fn listen(mut subscription: Subscription, pending: PendingMap) {
    while let Some(envelope) = subscription.recv().await {
        let Some(response) = ResponseMessage::decode(&envelope.data) else {
            continue;
        };
        let Some(request_id) = response.request_id.as_deref() else {
            tracing::trace!("dropping response without request id");
            continue;
        };

        // Take the entry before settling so a second response for the same
        // id (or a racing timeout) finds nothing.
        let entry = {
            let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
            match pending.entry(request_id.to_string()) {
                Entry::Occupied(slot) if Some(slot.get().operation) == response.operation() => {
                    Some(slot.remove())
                }
                _ => None,
            }
        };
        let Some(entry) = entry else {
            tracing::trace!(%request_id, "dropping response for unknown request");
            continue;
        };

        let settlement = if response.ok {
            Ok(response.detail)
        } else {
            Err(BusError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| REJECTED_FALLBACK.to_string()),
            ))
        };
        let _ = entry.settle.send(settlement);
    }
}
