//! Session capture and request signing for the privileged context.
//!
//! The host page exposes its session through an ambient key/value
//! accessor plus cookies. Everything here reads that state through two
//! narrow capabilities, [`SessionProvider`] and [`CookieStore`], so tests
//! can substitute fakes.

mod cookies;
pub mod signer;
mod snapshot;

pub use cookies::CookieJar;
pub use cookies::CookieStore;
pub use snapshot::SnapshotSession;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::value::host_string;
use crate::value::truthy_field;

/// Client name reported when the host does not provide one.
pub const DEFAULT_CLIENT_NAME: &str = "1";

#[derive(Debug, Error)]
pub enum SessionError {
    /// The host's session accessor is not reachable at all.
    #[error("Could not access YouTube config (ytcfg).")]
    Unavailable,

    /// The accessor is present but lacks the API key or request context.
    #[error("Missing YouTube internal API config.")]
    MissingField(&'static str),

    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    #[error("failed to read session snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid session snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session material captured fresh for a single mutation call.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub api_key: String,
    /// Opaque request context blob owned by the host.
    pub request_context: Value,
    pub client_name: String,
    pub client_version: String,
    pub session_index: String,
    pub visitor_data: String,
    /// Empty when the session is not acting on behalf of another account.
    pub delegated_session_id: String,
}

impl RuntimeConfig {
    /// Captures a config from the host's key/value accessor.
    ///
    /// `None` means the accessor itself is missing. Falsy values fall back
    /// to defaults the same way the host's own `||` chains do.
    pub fn from_host_values(values: Option<&Map<String, Value>>) -> Result<Self, SessionError> {
        let values = values.ok_or(SessionError::Unavailable)?;

        let api_key = truthy_field(values, "INNERTUBE_API_KEY")
            .map(host_string)
            .ok_or(SessionError::MissingField("INNERTUBE_API_KEY"))?;
        let request_context = truthy_field(values, "INNERTUBE_CONTEXT")
            .cloned()
            .ok_or(SessionError::MissingField("INNERTUBE_CONTEXT"))?;

        let text = |key: &str| truthy_field(values, key).map(host_string);

        Ok(Self {
            api_key,
            request_context,
            client_name: text("INNERTUBE_CONTEXT_CLIENT_NAME")
                .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
            client_version: text("INNERTUBE_CONTEXT_CLIENT_VERSION")
                .or_else(|| text("INNERTUBE_CLIENT_VERSION"))
                .unwrap_or_default(),
            session_index: text("SESSION_INDEX").unwrap_or_else(|| "0".to_string()),
            visitor_data: text("VISITOR_DATA").unwrap_or_default(),
            delegated_session_id: text("DELEGATED_SESSION_ID").unwrap_or_default(),
        })
    }
}

/// Capability that yields the current session config.
///
/// Implementations must read fresh state on every call; session state can
/// change between mutations.
pub trait SessionProvider: Send + Sync {
    fn current_config(&self) -> Result<RuntimeConfig, SessionError>;
}
