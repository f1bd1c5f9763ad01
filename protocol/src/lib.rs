//! Wire vocabulary shared by the restricted and privileged contexts.
//!
//! Both sides talk over an untyped, same-origin broadcast channel. This
//! crate pins down what travels on it: the source markers, the
//! request/response type tags, the message shapes, and the normalized
//! result a successful mutation produces.

mod message;
mod operation;
mod result;

pub use message::RequestMessage;
pub use message::RequestPayload;
pub use message::ResponseMessage;
pub use operation::Operation;
pub use result::ALREADY_MEMBER_STATUS;
pub use result::MutationRequest;
pub use result::MutationResult;
pub use result::SUCCEEDED_STATUS;

use thiserror::Error;

/// Marker carried by every message the restricted context publishes.
pub const CONTENT_SOURCE: &str = "YTQF_CONTENT";

/// Marker carried by every message the privileged context publishes.
pub const PAGE_SOURCE: &str = "YTQF_BRIDGE";

/// Caller-side precondition failures. These never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}
