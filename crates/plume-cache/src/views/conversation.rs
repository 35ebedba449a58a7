use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{as_object, decode, ProfileViewBasic};
use crate::error::Result;
use crate::EntityKind;

/// Conversation header without message state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConvoViewBasic {
    pub id: String,
    pub rev: String,
    pub members: Vec<ProfileViewBasic>,
    #[serde(default)]
    pub muted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConvoView {
    #[serde(flatten)]
    pub basic: ConvoViewBasic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Value>,
    pub unread_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationShape {
    Basic(ConvoViewBasic),
    Detailed(ConvoView),
}

impl ConversationShape {
    /// `unreadCount` marks the detailed shape.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = EntityKind::Conversation;
        let obj = as_object(kind, &value)?;

        if obj.contains_key("unreadCount") {
            Ok(Self::Detailed(decode(kind, value)?))
        } else {
            Ok(Self::Basic(decode(kind, value)?))
        }
    }

    pub fn basic(&self) -> &ConvoViewBasic {
        match self {
            Self::Basic(b) => b,
            Self::Detailed(c) => &c.basic,
        }
    }

    pub fn id(&self) -> &str {
        &self.basic().id
    }
}

impl From<ConvoViewBasic> for ConversationShape {
    fn from(view: ConvoViewBasic) -> Self {
        Self::Basic(view)
    }
}

impl From<ConvoView> for ConversationShape {
    fn from(view: ConvoView) -> Self {
        Self::Detailed(view)
    }
}
