use serde::{Deserialize, Serialize};
use serde_json::Value;

use plume_shared::constants::DEFAULT_CHAT_ALLOW_INCOMING;
use plume_shared::{AtUri, Did};

use super::{as_object, decode, present, Label, ListViewBasic};
use crate::error::Result;
use crate::EntityKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatAssociationView {
    pub allow_incoming: String,
}

impl Default for ChatAssociationView {
    fn default() -> Self {
        Self {
            allow_incoming: DEFAULT_CHAT_ALLOW_INCOMING.to_string(),
        }
    }
}

/// Partial "associated" metadata as sent by the server. Any field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAssociatedView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lists: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedgens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_packs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeler: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatAssociationView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KnownFollowers {
    pub count: u64,
    pub followers: Vec<ProfileViewBasic>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted_by_list: Option<ListViewBasic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<AtUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking_by_list: Option<ListViewBasic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<AtUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followed_by: Option<AtUri>,
    /// Only sent with the detailed shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_followers: Option<KnownFollowers>,
}

/// Leanest profile shape, embedded in posts, lists and conversations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewBasic {
    pub did: Did,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated: Option<ProfileAssociatedView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ProfileViewerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Profile shape returned by list endpoints (followers, list members, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub basic: ProfileViewBasic,
    /// `None` when the key is missing, `Some(None)` when it is null.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

/// Profile shape returned when fetching a single profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewDetailed {
    #[serde(flatten)]
    pub profile: ProfileView,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follows_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileShape {
    Basic(ProfileViewBasic),
    Standard(ProfileView),
    Detailed(ProfileViewDetailed),
}

impl ProfileShape {
    /// Classify a raw server view by field presence.
    ///
    /// `postsCount` marks the detailed shape, `description` the standard one.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = EntityKind::Profile;
        let obj = as_object(kind, &value)?;

        if obj.contains_key("postsCount") {
            Ok(Self::Detailed(decode(kind, value)?))
        } else if obj.contains_key("description") {
            Ok(Self::Standard(decode(kind, value)?))
        } else {
            Ok(Self::Basic(decode(kind, value)?))
        }
    }

    /// Fields shared by every shape.
    pub fn basic(&self) -> &ProfileViewBasic {
        match self {
            Self::Basic(b) => b,
            Self::Standard(p) => &p.basic,
            Self::Detailed(d) => &d.profile.basic,
        }
    }

    pub fn did(&self) -> &Did {
        &self.basic().did
    }

    /// `Some` only when the view carries the `description` key; a null
    /// value reads as empty.
    pub fn description(&self) -> Option<&str> {
        let field = match self {
            Self::Basic(_) => return None,
            Self::Standard(p) => &p.description,
            Self::Detailed(d) => &d.profile.description,
        };
        field.as_ref().map(|d| d.as_deref().unwrap_or_default())
    }

    pub fn detailed(&self) -> Option<&ProfileViewDetailed> {
        match self {
            Self::Detailed(d) => Some(d),
            _ => None,
        }
    }
}

impl From<ProfileViewBasic> for ProfileShape {
    fn from(view: ProfileViewBasic) -> Self {
        Self::Basic(view)
    }
}

impl From<ProfileView> for ProfileShape {
    fn from(view: ProfileView) -> Self {
        Self::Standard(view)
    }
}

impl From<ProfileViewDetailed> for ProfileShape {
    fn from(view: ProfileViewDetailed) -> Self {
        Self::Detailed(view)
    }
}
