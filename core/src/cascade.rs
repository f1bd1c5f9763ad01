//! The ordered table of request shapes tried for each mutation.
//!
//! The remote edit API accepts collection ids with or without a two-letter
//! prefix depending on surface, and has retired at least one removal action
//! shape. Rather than guessing, every combination is tried in a fixed
//! order: collection id form, then endpoint, then action shape.

use serde_json::Map;
use serde_json::Value;
use ytqf_protocol::MutationRequest;
use ytqf_protocol::Operation;

/// Prefix the host uses for browse-form collection ids.
pub const COLLECTION_PREFIX: &str = "VL";

/// Edit endpoint tried when no others are configured.
pub const DEFAULT_EDIT_ENDPOINT: &str = "/youtubei/v1/browse/edit_playlist";

/// One action object with its item id field left to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTemplate {
    pub action: &'static str,
    /// Field that receives the item id.
    pub id_field: &'static str,
}

const ADD_VARIANTS: &[&[ActionTemplate]] = &[&[ActionTemplate {
    action: "ACTION_ADD_VIDEO",
    id_field: "addedVideoId",
}]];

const REMOVE_VARIANTS: &[&[ActionTemplate]] = &[
    &[ActionTemplate {
        action: "ACTION_REMOVE_VIDEO_BY_VIDEO_ID",
        id_field: "removedVideoId",
    }],
    &[ActionTemplate {
        action: "ACTION_REMOVE_VIDEO",
        id_field: "removedVideoId",
    }],
];

/// Action shapes for `operation`, highest priority first.
pub fn action_variants(operation: Operation) -> &'static [&'static [ActionTemplate]] {
    match operation {
        Operation::Add => ADD_VARIANTS,
        Operation::Remove => REMOVE_VARIANTS,
    }
}

/// Strips the collection prefix when present (and something follows it),
/// otherwise prepends it.
pub fn toggle_prefix(collection_id: &str) -> String {
    match collection_id.strip_prefix(COLLECTION_PREFIX) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => format!("{COLLECTION_PREFIX}{collection_id}"),
    }
}

/// The literal id followed by its toggled-prefix form.
pub fn collection_id_variants(collection_id: &str) -> [String; 2] {
    [collection_id.to_string(), toggle_prefix(collection_id)]
}

/// Fills `item_id` into each template, yielding the `actions` array.
pub fn render_actions(templates: &[ActionTemplate], item_id: &str) -> Value {
    Value::Array(
        templates
            .iter()
            .map(|template| {
                let mut action = Map::new();
                action.insert("action".to_string(), Value::from(template.action));
                action.insert(template.id_field.to_string(), Value::from(item_id));
                Value::Object(action)
            })
            .collect(),
    )
}

/// A single request in the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptDescriptor {
    pub collection_id: String,
    pub endpoint: String,
    /// Index into [`action_variants`] for the request's operation.
    pub variant_index: usize,
    pub actions: Value,
}

impl AttemptDescriptor {
    /// `endpoint(collectionId)`, the prefix of every per-attempt diagnostic.
    pub fn label(&self) -> String {
        format!("{}({})", self.endpoint, self.collection_id)
    }
}

/// Expands `request` into the flat, ordered list of attempts.
///
/// The list has `2 × endpoints × action variants` entries and never repeats
/// a combination.
pub fn plan_attempts(request: &MutationRequest, endpoints: &[String]) -> Vec<AttemptDescriptor> {
    let variants = action_variants(request.operation);
    let mut attempts = Vec::with_capacity(2 * endpoints.len() * variants.len());
    for collection_id in collection_id_variants(&request.collection_id) {
        for endpoint in endpoints {
            for (variant_index, templates) in variants.iter().enumerate() {
                attempts.push(AttemptDescriptor {
                    collection_id: collection_id.clone(),
                    endpoint: endpoint.clone(),
                    variant_index,
                    actions: render_actions(templates, &request.item_id),
                });
            }
        }
    }
    attempts
}
