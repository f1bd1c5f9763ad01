//! Normalizes the edit API's inconsistent response shapes.
//!
//! A successful edit may report a top-level `status`, a
//! `playlistEditResults` array whose entries carry their own status, or
//! only structural result markers. Errors may arrive as an HTTP status, an
//! `error` object in a 200 body, or a non-success status string.

use serde_json::Value;
use thiserror::Error;
use ytqf_protocol::ALREADY_MEMBER_STATUS;
use ytqf_protocol::Operation;
use ytqf_protocol::SUCCEEDED_STATUS;

use crate::transport::EditResponse;
use crate::value::host_string;
use crate::value::is_truthy;

const RESULTS_FIELD: &str = "playlistEditResults";
const ADDED_MARKER: &str = "playlistEditVideoAddedResultData";
const ALREADY_MEMBER_MARKER: &str = "playlistEditVideoAlreadyInPlaylistResultData";

/// Most top-level keys listed in a schema-ambiguity diagnostic.
const MAX_DIAGNOSTIC_KEYS: usize = 8;

/// Why a single cascade attempt did not succeed. Rendered as the reason
/// half of an `endpoint(collectionId): reason` diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    /// No response was obtained.
    #[error("network {0}")]
    Network(String),

    /// Non-2xx status or an explicit error object in the body.
    #[error("{0}")]
    Transport(String),

    /// Neither a status string nor a results list. Holds the first few
    /// top-level keys, or `no-payload` when there was no body.
    #[error("no-playlistEditResults [{0}]")]
    SchemaAmbiguous(String),

    /// The first status the operation does not accept.
    #[error("{0}")]
    StatusRejected(String),
}

/// Statuses recovered from an edit response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditResult {
    pub statuses: Vec<String>,
    /// Set when a result entry carried the already-member marker.
    pub already_member: bool,
    /// Whether the body had a results array at all, even an empty one.
    pub has_results: bool,
}

impl EditResult {
    /// True when either already-member signal is present: the structural
    /// marker or the literal status string.
    pub fn reports_already_member(&self) -> bool {
        self.already_member || self.statuses.iter().any(|status| status == ALREADY_MEMBER_STATUS)
    }
}

/// Collects statuses from `body` in document order: the top-level status
/// first, then each result entry's status and marker-derived statuses.
pub fn parse_edit_result(body: Option<&Value>) -> EditResult {
    let mut result = EditResult::default();
    let Some(body) = body else {
        return result;
    };

    if let Some(status) = body.get("status").and_then(Value::as_str) {
        result.statuses.push(status.to_string());
    }

    if let Some(entries) = body.get(RESULTS_FIELD).and_then(Value::as_array) {
        result.has_results = true;
        for entry in entries {
            if let Some(status) = entry.get("status").and_then(Value::as_str) {
                result.statuses.push(status.to_string());
            }
            if entry.get(ADDED_MARKER).is_some_and(is_truthy) {
                result.statuses.push(SUCCEEDED_STATUS.to_string());
            }
            if entry.get(ALREADY_MEMBER_MARKER).is_some_and(is_truthy) {
                result.already_member = true;
                result.statuses.push(ALREADY_MEMBER_STATUS.to_string());
            }
        }
    }
    result
}

/// Transport-level error text, or `None` when the response is usable.
pub fn http_error(response: &EditResponse) -> Option<String> {
    let error = response
        .body
        .as_ref()
        .and_then(|body| body.get("error"))
        .filter(|error| is_truthy(error));
    if response.is_success() && error.is_none() {
        return None;
    }
    let message = error
        .and_then(|error| error.get("message"))
        .filter(|message| is_truthy(message))
        .map(host_string);
    Some(message.unwrap_or_else(|| format!("HTTP {}", response.status)))
}

/// Whether `operation` treats `status` as success.
pub fn is_accepted(operation: Operation, status: &str) -> bool {
    match operation {
        Operation::Add => status == SUCCEEDED_STATUS || status == ALREADY_MEMBER_STATUS,
        Operation::Remove => status == SUCCEEDED_STATUS,
    }
}

/// Classifies one attempt's response for `operation`.
///
/// An empty status list is accepted when a results array was present.
pub fn classify(operation: Operation, response: &EditResponse) -> Result<EditResult, AttemptFailure> {
    if let Some(message) = http_error(response) {
        return Err(AttemptFailure::Transport(message));
    }

    let result = parse_edit_result(response.body.as_ref());
    if result.statuses.is_empty() && !result.has_results {
        return Err(AttemptFailure::SchemaAmbiguous(diagnostic_keys(
            response.body.as_ref(),
        )));
    }

    if let Some(rejected) = result
        .statuses
        .iter()
        .find(|status| !is_accepted(operation, status))
    {
        return Err(AttemptFailure::StatusRejected(rejected.clone()));
    }
    Ok(result)
}

/// Own keys of the body the way the host enumerates them: object keys in
/// order, element indices for arrays and strings, none for other scalars.
fn diagnostic_keys(body: Option<&Value>) -> String {
    let keys: Vec<String> = match body.filter(|body| is_truthy(body)) {
        None => return "no-payload".to_string(),
        Some(Value::Object(map)) => map.keys().take(MAX_DIAGNOSTIC_KEYS).cloned().collect(),
        Some(Value::Array(items)) => index_keys(items.len()),
        Some(Value::String(text)) => index_keys(text.encode_utf16().count()),
        Some(_) => Vec::new(),
    };
    keys.join(",")
}

fn index_keys(len: usize) -> Vec<String> {
    (0..len.min(MAX_DIAGNOSTIC_KEYS))
        .map(|index| index.to_string())
        .collect()
}
