use serde::{Deserialize, Serialize};
use serde_json::Value;

use plume_shared::AtUri;

use super::{as_object, decode, Label, ProfileView};
use crate::error::Result;
use crate::EntityKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListViewerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    /// URI of the viewer's block record for this list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<AtUri>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListViewBasic {
    pub uri: AtUri,
    pub cid: String,
    pub name: String,
    /// e.g. `app.bsky.graph.defs#modlist`
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_item_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ListViewerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    #[serde(flatten)]
    pub basic: ListViewBasic,
    pub creator: ProfileView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_facets: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListShape {
    Basic(ListViewBasic),
    Full(ListView),
}

impl ListShape {
    /// `creator` marks the full shape.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = EntityKind::List;
        let obj = as_object(kind, &value)?;

        if obj.contains_key("creator") {
            Ok(Self::Full(decode(kind, value)?))
        } else {
            Ok(Self::Basic(decode(kind, value)?))
        }
    }

    pub fn basic(&self) -> &ListViewBasic {
        match self {
            Self::Basic(b) => b,
            Self::Full(l) => &l.basic,
        }
    }

    pub fn uri(&self) -> &AtUri {
        &self.basic().uri
    }
}

impl From<ListViewBasic> for ListShape {
    fn from(view: ListViewBasic) -> Self {
        Self::Basic(view)
    }
}

impl From<ListView> for ListShape {
    fn from(view: ListView) -> Self {
        Self::Full(view)
    }
}
