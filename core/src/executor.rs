//! Runs a mutation through the variant cascade until the remote service
//! accepts one shape of it.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use ytqf_protocol::MutationRequest;
use ytqf_protocol::MutationResult;
use ytqf_protocol::Operation;
use ytqf_protocol::ProtocolError;

use crate::cascade::AttemptDescriptor;
use crate::cascade::DEFAULT_EDIT_ENDPOINT;
use crate::cascade::plan_attempts;
use crate::classify::AttemptFailure;
use crate::classify::EditResult;
use crate::classify::classify;
use crate::config::RelayConfig;
use crate::session::CookieStore;
use crate::session::RuntimeConfig;
use crate::session::SessionError;
use crate::session::SessionProvider;
use crate::session::SnapshotSession;
use crate::session::signer::authorization_header;
use crate::session::signer::build_headers;
use crate::session::signer::build_request_context;
use crate::session::signer::session_secret;
use crate::transport::EditRequest;
use crate::transport::EditTransport;
use crate::transport::HttpTransport;
use crate::transport::TransportError;

/// Origin the host signs requests for.
pub const DEFAULT_ORIGIN: &str = "https://www.youtube.com";

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Caller input was incomplete; nothing was sent.
    #[error("{0}")]
    Precondition(#[from] ProtocolError),

    /// The session could not be captured; nothing was sent.
    #[error("{0}")]
    ConfigUnavailable(#[from] SessionError),

    /// Every cascade entry failed.
    #[error("{0}")]
    Exhausted(Exhaustion),
}

/// Diagnostics from a cascade in which no attempt succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhaustion {
    pub operation: Operation,
    /// One `endpoint(collectionId): reason` line per attempt, in order.
    pub diagnostics: Vec<String>,
}

impl fmt::Display for Exhaustion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&exhaustion_message(self.operation, &self.diagnostics))
    }
}

/// `<prefix>: <diag> | <diag> ... <hint>`.
pub fn exhaustion_message(operation: Operation, diagnostics: &[String]) -> String {
    let (prefix, hint) = match operation {
        Operation::Add => (
            "YouTube rejected add action",
            "(check playlist ownership/channel and that manual Save works for this playlist)",
        ),
        Operation::Remove => (
            "YouTube rejected remove action",
            "(if this repeats, YouTube may require video-specific set IDs for removal)",
        ),
    };
    format!("{prefix}: {} {hint}", diagnostics.join(" | "))
}

/// Privileged-side executor for membership mutations.
///
/// Stateless between calls: each call captures a fresh session config, so
/// concurrent calls are independent.
pub struct MutationExecutor {
    session: Arc<dyn SessionProvider>,
    cookies: Arc<dyn CookieStore>,
    transport: Arc<dyn EditTransport>,
    origin: String,
    endpoints: Vec<String>,
}

impl MutationExecutor {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        cookies: Arc<dyn CookieStore>,
        transport: Arc<dyn EditTransport>,
    ) -> Self {
        Self {
            session,
            cookies,
            transport,
            origin: DEFAULT_ORIGIN.to_string(),
            endpoints: vec![DEFAULT_EDIT_ENDPOINT.to_string()],
        }
    }

    /// Origin used for signing and the `x-origin` header.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Endpoint paths to try, in order. An empty list keeps the current set.
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        if !endpoints.is_empty() {
            self.endpoints = endpoints;
        }
        self
    }

    /// Executor backed by the configured session snapshot and an HTTP
    /// transport.
    pub fn from_config(config: &RelayConfig) -> Result<Self, TransportError> {
        let session = Arc::new(SnapshotSession::with_path(config.session_file.clone()));
        let transport = HttpTransport::new(config.api_base_url(), config.http_timeout())?;
        Ok(Self::new(session.clone(), session, Arc::new(transport))
            .with_origin(config.origin.clone())
            .with_endpoints(config.endpoints.clone()))
    }

    pub async fn add(
        &self,
        item_id: &str,
        collection_id: &str,
    ) -> Result<MutationResult, ExecutorError> {
        self.execute(&MutationRequest::add(item_id, collection_id)?)
            .await
    }

    pub async fn remove(
        &self,
        item_id: &str,
        collection_id: &str,
    ) -> Result<MutationResult, ExecutorError> {
        self.execute(&MutationRequest::remove(item_id, collection_id)?)
            .await
    }

    /// Tries each planned attempt in order and returns the first success.
    pub async fn execute(&self, request: &MutationRequest) -> Result<MutationResult, ExecutorError> {
        let config = self.session.current_config()?;
        let attempts = plan_attempts(request, &self.endpoints);
        let mut diagnostics = Vec::with_capacity(attempts.len());

        for attempt in &attempts {
            tracing::debug!(
                operation = %request.operation,
                endpoint = %attempt.endpoint,
                collection_id = %attempt.collection_id,
                variant = attempt.variant_index,
                "trying edit variant"
            );
            match self.attempt(request.operation, &config, attempt).await? {
                Ok(result) => {
                    tracing::info!(
                        operation = %request.operation,
                        endpoint = %attempt.endpoint,
                        collection_id = %attempt.collection_id,
                        "edit accepted"
                    );
                    return Ok(success(request.operation, result, attempt));
                }
                Err(failure) => {
                    let diagnostic = format!("{}: {failure}", attempt.label());
                    tracing::debug!("edit variant failed: {diagnostic}");
                    diagnostics.push(diagnostic);
                }
            }
        }

        tracing::warn!(
            operation = %request.operation,
            attempts = diagnostics.len(),
            "every edit variant was rejected"
        );
        Err(ExecutorError::Exhausted(Exhaustion {
            operation: request.operation,
            diagnostics,
        }))
    }

    /// One request. The outer error aborts the cascade; the inner one is a
    /// per-attempt failure the cascade continues past.
    async fn attempt(
        &self,
        operation: Operation,
        config: &RuntimeConfig,
        attempt: &AttemptDescriptor,
    ) -> Result<Result<EditResult, AttemptFailure>, ExecutorError> {
        let cookies = self.cookies.cookie_jar();
        let secret = session_secret(&cookies);
        let authorization = authorization_header(secret.as_deref(), &self.origin);
        let headers = build_headers(config, &self.origin, authorization.as_deref())?;

        let request = EditRequest {
            endpoint: attempt.endpoint.clone(),
            api_key: config.api_key.clone(),
            headers,
            cookie_header: cookies.cookie_header(),
            body: json!({
                "context": build_request_context(config),
                "playlistId": attempt.collection_id,
                "actions": attempt.actions,
            }),
        };

        let outcome = match self.transport.send(request).await {
            Ok(response) => classify(operation, &response),
            Err(err) => Err(AttemptFailure::Network(err.to_string())),
        };
        Ok(outcome)
    }
}

fn success(operation: Operation, result: EditResult, attempt: &AttemptDescriptor) -> MutationResult {
    let endpoint = attempt.endpoint.clone();
    let collection_id = attempt.collection_id.clone();
    match operation {
        Operation::Add if result.reports_already_member() => {
            MutationResult::already_member(result.statuses, endpoint, collection_id)
        }
        Operation::Add => MutationResult::added(result.statuses, endpoint, collection_id),
        Operation::Remove => MutationResult::removed(result.statuses, endpoint, collection_id),
    }
}
