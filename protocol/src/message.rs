use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::CONTENT_SOURCE;
use crate::MutationRequest;
use crate::MutationResult;
use crate::Operation;
use crate::PAGE_SOURCE;

// ─────────────────────────────────────────────────────────────────────────────
// Request (restricted -> privileged)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    #[serde(default, alias = "videoId", skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, alias = "playlistId", skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

impl RequestPayload {
    fn from_value(value: &Value) -> Self {
        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| value.get(*name).and_then(Value::as_str))
                .map(str::to_string)
        };
        Self {
            item_id: field(&["itemId", "videoId"]),
            collection_id: field(&["collectionId", "playlistId"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub source: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<RequestPayload>,
}

impl RequestMessage {
    pub fn new(request_id: impl Into<String>, request: &MutationRequest) -> Self {
        Self {
            source: CONTENT_SOURCE.to_string(),
            message_type: request.operation.request_type().to_string(),
            request_id: Some(request_id.into()),
            payload: Some(RequestPayload {
                item_id: Some(request.item_id.clone()),
                collection_id: Some(request.collection_id.clone()),
            }),
        }
    }

    /// True when `value` carries the content source marker and a known
    /// request type. Everything else on the channel is foreign.
    pub fn matches(value: &Value) -> bool {
        value.get("source").and_then(Value::as_str) == Some(CONTENT_SOURCE)
            && value
                .get("type")
                .and_then(Value::as_str)
                .and_then(Operation::from_request_type)
                .is_some()
    }

    /// Decodes a request, tolerating missing or mistyped optional fields.
    pub fn decode(value: &Value) -> Option<Self> {
        if !Self::matches(value) {
            return None;
        }
        Some(Self {
            source: CONTENT_SOURCE.to_string(),
            message_type: value.get("type").and_then(Value::as_str)?.to_string(),
            request_id: value
                .get("requestId")
                .and_then(Value::as_str)
                .map(str::to_string),
            payload: value.get("payload").map(RequestPayload::from_value),
        })
    }

    pub fn operation(&self) -> Option<Operation> {
        Operation::from_request_type(&self.message_type)
    }

    /// The validated mutation, or `None` when the id, item or collection is
    /// missing or empty.
    pub fn mutation_request(&self) -> Option<MutationRequest> {
        let operation = self.operation()?;
        if self.request_id.as_deref().is_none_or(str::is_empty) {
            return None;
        }
        let payload = self.payload.as_ref()?;
        MutationRequest::new(
            operation,
            payload.item_id.clone()?,
            payload.collection_id.clone()?,
        )
        .ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response (privileged -> restricted)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub source: String,
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<MutationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseMessage {
    pub fn success(operation: Operation, request_id: Option<String>, detail: MutationResult) -> Self {
        Self {
            source: PAGE_SOURCE.to_string(),
            message_type: operation.response_type().to_string(),
            request_id,
            ok: true,
            detail: Some(detail),
            error: None,
        }
    }

    pub fn failure(
        operation: Operation,
        request_id: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            source: PAGE_SOURCE.to_string(),
            message_type: operation.response_type().to_string(),
            request_id,
            ok: false,
            detail: None,
            error: Some(error.into()),
        }
    }

    /// True when `value` carries the page source marker and a known
    /// response type.
    pub fn matches(value: &Value) -> bool {
        value.get("source").and_then(Value::as_str) == Some(PAGE_SOURCE)
            && value
                .get("type")
                .and_then(Value::as_str)
                .and_then(Operation::from_response_type)
                .is_some()
    }

    /// Decodes a response. Only a JSON `true` counts as `ok`; a detail that
    /// does not have the result shape is treated as absent.
    pub fn decode(value: &Value) -> Option<Self> {
        if !Self::matches(value) {
            return None;
        }
        Some(Self {
            source: PAGE_SOURCE.to_string(),
            message_type: value.get("type").and_then(Value::as_str)?.to_string(),
            request_id: value
                .get("requestId")
                .and_then(Value::as_str)
                .map(str::to_string),
            ok: value.get("ok").and_then(Value::as_bool).unwrap_or(false),
            detail: value
                .get("detail")
                .and_then(|detail| serde_json::from_value(detail.clone()).ok()),
            error: value
                .get("error")
                .and_then(Value::as_str)
                .filter(|error| !error.is_empty())
                .map(str::to_string),
        })
    }

    pub fn operation(&self) -> Option<Operation> {
        Operation::from_response_type(&self.message_type)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
