use serde::{Deserialize, Serialize};
use serde_json::Value;

use plume_shared::AtUri;

use super::{as_object, decode, Label, ProfileViewBasic};
use crate::error::{CacheError, Result};
use crate::EntityKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StrongRef {
    pub uri: AtUri,
    pub cid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyRef {
    pub root: StrongRef,
    pub parent: StrongRef,
}

/// The post record itself. Unknown record fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub langs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostViewerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repost: Option<AtUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like: Option<AtUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_disabled: Option<bool>,
}

/// Full post view, as returned by feeds, threads and `getPosts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub uri: AtUri,
    pub cid: String,
    pub author: ProfileViewBasic,
    pub record: PostRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repost_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_count: Option<u64>,
    pub indexed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<PostViewerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threadgate: Option<Value>,
}

/// Lean post view found inside record embeds (quotes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedPostView {
    pub uri: AtUri,
    pub cid: String,
    pub author: ProfileViewBasic,
    pub value: PostRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    pub indexed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostShape {
    Embedded(EmbeddedPostView),
    Full(PostView),
}

impl PostShape {
    /// `record` marks the full shape, `value` the embedded one. A view with
    /// neither is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = EntityKind::Post;
        let obj = as_object(kind, &value)?;

        if obj.contains_key("record") {
            Ok(Self::Full(decode(kind, value)?))
        } else if obj.contains_key("value") {
            Ok(Self::Embedded(decode(kind, value)?))
        } else {
            Err(CacheError::shape(kind, "neither `record` nor `value` present"))
        }
    }

    pub fn uri(&self) -> &AtUri {
        match self {
            Self::Embedded(p) => &p.uri,
            Self::Full(p) => &p.uri,
        }
    }

    pub fn cid(&self) -> &str {
        match self {
            Self::Embedded(p) => &p.cid,
            Self::Full(p) => &p.cid,
        }
    }

    pub fn author(&self) -> &ProfileViewBasic {
        match self {
            Self::Embedded(p) => &p.author,
            Self::Full(p) => &p.author,
        }
    }

    pub fn record(&self) -> &PostRecord {
        match self {
            Self::Embedded(p) => &p.value,
            Self::Full(p) => &p.record,
        }
    }

    pub fn labels(&self) -> Option<&[Label]> {
        match self {
            Self::Embedded(p) => p.labels.as_deref(),
            Self::Full(p) => p.labels.as_deref(),
        }
    }

    pub fn indexed_at(&self) -> &str {
        match self {
            Self::Embedded(p) => &p.indexed_at,
            Self::Full(p) => &p.indexed_at,
        }
    }
}

impl From<PostView> for PostShape {
    fn from(view: PostView) -> Self {
        Self::Full(view)
    }
}

impl From<EmbeddedPostView> for PostShape {
    fn from(view: EmbeddedPostView) -> Self {
        Self::Embedded(view)
    }
}
