//! Delivery of a single edit request to the remote API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid request url {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Everything needed to issue one edit call.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Path under the API base, e.g. `/youtubei/v1/browse/edit_playlist`.
    pub endpoint: String,
    pub api_key: String,
    pub headers: HeaderMap,
    /// Raw `Cookie` header forwarded with the call.
    pub cookie_header: Option<String>,
    pub body: Value,
}

/// Raw outcome of an edit call.
#[derive(Debug, Clone, PartialEq)]
pub struct EditResponse {
    pub status: u16,
    /// Parsed body; `None` when the body was not valid JSON.
    pub body: Option<Value>,
}

impl EditResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait EditTransport: Send + Sync {
    /// Sends `request`. Only failures to obtain a response at all are
    /// errors; HTTP error statuses come back as an [`EditResponse`], with
    /// `body` set to `None` when it was unreadable or not JSON.
    async fn send(&self, request: EditRequest) -> Result<EditResponse, TransportError>;
}

/// [`EditTransport`] over HTTPS with reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}{endpoint}?key=…&prettyPrint=false`.
    pub fn request_url(&self, endpoint: &str, api_key: &str) -> Result<Url, TransportError> {
        let raw = format!("{}{endpoint}", self.base_url);
        let mut url = Url::parse(&raw).map_err(|err| TransportError::InvalidUrl {
            url: raw.clone(),
            message: err.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("key", api_key)
            .append_pair("prettyPrint", "false");
        Ok(url)
    }
}

#[async_trait]
impl EditTransport for HttpTransport {
    async fn send(&self, request: EditRequest) -> Result<EditResponse, TransportError> {
        let url = self.request_url(&request.endpoint, &request.api_key)?;

        let mut headers = request.headers;
        if let Some(cookie) = request.cookie_header.as_deref() {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(_) => tracing::warn!("dropping cookie header with invalid characters"),
            }
        }

        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(request.body.to_string())
            .send()
            .await?;
        let status = response.status().as_u16();
        // A body that cannot be read or parsed is absent, not a failure; the
        // status alone still classifies the attempt.
        let body = match response.text().await {
            Ok(text) => serde_json::from_str(&text).ok(),
            Err(err) => {
                tracing::debug!(status, "edit response body unreadable: {err}");
                None
            }
        };
        Ok(EditResponse { status, body })
    }
}
