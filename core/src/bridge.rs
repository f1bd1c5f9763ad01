//! Privileged-side listener that answers relay requests.
//!
//! Subscribes to same-origin request messages, runs each one through the
//! [`MutationExecutor`] on its own task, and posts the correlated response.

use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use ytqf_bus::ContextOrigin;
use ytqf_bus::Envelope;
use ytqf_bus::MessageBus;
use ytqf_bus::Subscription;
use ytqf_protocol::RequestMessage;
use ytqf_protocol::ResponseMessage;

use crate::executor::MutationExecutor;

const MISSING_PAYLOAD: &str = "Missing request payload.";

pub struct Bridge {
    bus: Arc<dyn MessageBus>,
    origin: ContextOrigin,
    executor: Arc<MutationExecutor>,
}

impl Bridge {
    pub fn new(
        bus: Arc<dyn MessageBus>,
        origin: ContextOrigin,
        executor: Arc<MutationExecutor>,
    ) -> Self {
        Self {
            bus,
            origin,
            executor,
        }
    }

    /// Answers requests until `shutdown` is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) {
        let subscription = self.subscribe();
        self.run(subscription, shutdown).await;
    }

    /// Subscribes immediately, then serves on a background task. Requests
    /// published after this returns are guaranteed to be seen.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        let subscription = self.subscribe();
        tokio::spawn(self.run(subscription, shutdown))
    }

    fn subscribe(&self) -> Subscription {
        let origin = self.origin;
        self.bus.subscribe(Box::new(move |envelope: &Envelope| {
            envelope.origin == origin && RequestMessage::matches(&envelope.data)
        }))
    }

    async fn run(self, mut subscription: Subscription, shutdown: CancellationToken) {
        tracing::debug!(origin = self.origin.id(), "bridge listening");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                envelope = subscription.recv() => match envelope {
                    Some(envelope) => self.dispatch(&envelope.data),
                    None => break,
                },
            }
        }
        subscription.unsubscribe();
        tracing::debug!(origin = self.origin.id(), "bridge stopped");
    }

    fn dispatch(&self, data: &Value) {
        let Some(message) = RequestMessage::decode(data) else {
            return;
        };
        let Some(operation) = message.operation() else {
            return;
        };

        let Some(request) = message.mutation_request() else {
            tracing::debug!(%operation, "rejecting request with missing payload");
            self.publish(ResponseMessage::failure(
                operation,
                message.request_id,
                MISSING_PAYLOAD.to_string(),
            ));
            return;
        };

        let bus = Arc::clone(&self.bus);
        let origin = self.origin;
        let executor = Arc::clone(&self.executor);
        let request_id = message.request_id;
        tokio::spawn(async move {
            let response = match executor.execute(&request).await {
                Ok(detail) => ResponseMessage::success(operation, request_id, detail),
                Err(err) => {
                    tracing::warn!(%operation, "mutation failed: {err}");
                    ResponseMessage::failure(operation, request_id, err.to_string())
                }
            };
            bus.publish(Envelope::new(origin, response.to_value()));
        });
    }

    fn publish(&self, response: ResponseMessage) {
        self.bus
            .publish(Envelope::new(self.origin, response.to_value()));
    }
}
