use serde::Deserialize;
use serde::Serialize;

use crate::Operation;
use crate::ProtocolError;

/// Status the remote service reports for an accepted edit.
pub const SUCCEEDED_STATUS: &str = "STATUS_SUCCEEDED";

/// Status the remote service reports when the item is already present.
pub const ALREADY_MEMBER_STATUS: &str = "VIDEO_ALREADY_IN_PLAYLIST";

const ADDED_MESSAGE: &str = "Added";
const ALREADY_MEMBER_MESSAGE: &str = "Already in playlist";
const REMOVED_MESSAGE: &str = "Removed";

/// A validated membership mutation.
///
/// Construction fails when either identifier is empty, which keeps
/// malformed requests off the wire entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRequest {
    pub operation: Operation,
    pub item_id: String,
    pub collection_id: String,
}

impl MutationRequest {
    pub fn new(
        operation: Operation,
        item_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let item_id = item_id.into();
        let collection_id = collection_id.into();
        if item_id.is_empty() {
            return Err(ProtocolError::MissingField("itemId"));
        }
        if collection_id.is_empty() {
            return Err(ProtocolError::MissingField("collectionId"));
        }
        Ok(Self {
            operation,
            item_id,
            collection_id,
        })
    }

    pub fn add(
        item_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        Self::new(Operation::Add, item_id, collection_id)
    }

    pub fn remove(
        item_id: impl Into<String>,
        collection_id: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        Self::new(Operation::Remove, item_id, collection_id)
    }
}

/// Normalized outcome of a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResult {
    pub message: String,
    pub statuses: Vec<String>,
    /// Endpoint path that accepted the edit.
    pub endpoint: String,
    /// Identifier form the remote service accepted, which may differ from
    /// the one the caller supplied.
    #[serde(alias = "playlistId")]
    pub collection_id: String,
}

impl MutationResult {
    pub fn added(statuses: Vec<String>, endpoint: String, collection_id: String) -> Self {
        Self {
            message: ADDED_MESSAGE.to_string(),
            statuses,
            endpoint,
            collection_id,
        }
    }

    pub fn already_member(statuses: Vec<String>, endpoint: String, collection_id: String) -> Self {
        Self {
            message: ALREADY_MEMBER_MESSAGE.to_string(),
            statuses,
            endpoint,
            collection_id,
        }
    }

    pub fn removed(statuses: Vec<String>, endpoint: String, collection_id: String) -> Self {
        Self {
            message: REMOVED_MESSAGE.to_string(),
            statuses,
            endpoint,
            collection_id,
        }
    }

    pub fn is_already_member(&self) -> bool {
        self.message == ALREADY_MEMBER_MESSAGE
    }

    /// Request that reverts the mutation which produced this result.
    ///
    /// An add that found the item already present changed nothing, so it
    /// has no undo.
    pub fn undo_request(
        &self,
        operation: Operation,
        item_id: &str,
        collection_id: &str,
    ) -> Option<MutationRequest> {
        if operation == Operation::Add && self.is_already_member() {
            return None;
        }
        MutationRequest::new(operation.inverse(), item_id, collection_id).ok()
    }
}
