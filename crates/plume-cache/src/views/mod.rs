//! Server view types and shape classification.
//!
//! The server returns several increasingly detailed views of the same
//! entity, distinguished only by which fields are present. Each kind's
//! `*Shape` enum is the closed set of those variants; classification
//! happens once, here, so the rest of the crate matches on a real sum type.

mod conversation;
mod list;
mod post;
mod profile;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{CacheError, Result};
use crate::EntityKind;

pub use conversation::{ConversationShape, ConvoView, ConvoViewBasic};
pub use list::{ListShape, ListView, ListViewBasic, ListViewerState};
pub use post::{
    EmbeddedPostView, PostRecord, PostShape, PostView, PostViewerState, ReplyRef, StrongRef,
};
pub use profile::{
    ChatAssociationView, KnownFollowers, ProfileAssociatedView, ProfileShape, ProfileView,
    ProfileViewBasic, ProfileViewDetailed, ProfileViewerState,
};

/// A moderation label attached to an account or record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// DID of the labeler that emitted the label.
    pub src: String,
    /// Subject of the label (account DID or record URI).
    pub uri: String,
    pub val: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neg: Option<bool>,
    pub cts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<String>,
}

fn as_object(kind: EntityKind, value: &Value) -> Result<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| CacheError::shape(kind, "expected a JSON object"))
}

/// Keeps a present key apart from a missing one: `Some(None)` for an
/// explicit null, `None` (via `#[serde(default)]`) when absent.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn decode<T: DeserializeOwned>(kind: EntityKind, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CacheError::shape(kind, e.to_string()))
}
