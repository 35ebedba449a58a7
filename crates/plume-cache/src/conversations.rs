//! Signalized chat conversations.

use std::rc::Rc;

use serde_json::Value;

use plume_shared::{Did, EntityKey};

use crate::cache::EntityCache;
use crate::error::Result;
use crate::identity_map::{Tracked, Tracking, VersionTag};
use crate::profiles::SignalizedProfile;
use crate::signal::{same_rcs, Signal};
use crate::views::{ConversationShape, ProfileShape};

#[derive(Debug)]
pub struct SignalizedConversation {
    pub session: Did,
    pub id: String,
    pub rev: Signal<String>,
    pub members: Signal<Vec<Rc<SignalizedProfile>>>,
    pub muted: Signal<bool>,
    pub last_message: Signal<Option<Value>>,
    pub unread_count: Signal<u64>,
    tracking: Tracking,
}

impl SignalizedConversation {
    fn new(
        session: Did,
        view: &ConversationShape,
        members: Vec<Rc<SignalizedProfile>>,
        tracking: Tracking,
    ) -> Self {
        let basic = view.basic();
        let (last_message, unread_count) = match view {
            ConversationShape::Detailed(c) => (c.last_message.clone(), c.unread_count),
            ConversationShape::Basic(_) => (None, 0),
        };

        Self {
            session,
            id: basic.id.clone(),
            rev: Signal::new(basic.rev.clone()),
            members: Signal::with_equality(members, same_rcs),
            muted: Signal::new(basic.muted),
            last_message: Signal::new(last_message),
            unread_count: Signal::new(unread_count),
            tracking,
        }
    }

    fn apply(&self, view: &ConversationShape, members: Vec<Rc<SignalizedProfile>>) {
        let basic = view.basic();
        self.rev.set(basic.rev.clone());
        self.members.set(members);
        self.muted.set(basic.muted);

        if let ConversationShape::Detailed(c) = view {
            self.last_message.set(c.last_message.clone());
            self.unread_count.set(c.unread_count);
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.session, &self.id)
    }

    /// Members other than the session's own account.
    pub fn recipients(&self) -> Vec<Rc<SignalizedProfile>> {
        self.members
            .peek()
            .iter()
            .filter(|m| m.did != self.session)
            .cloned()
            .collect()
    }
}

impl Tracked for SignalizedConversation {
    fn tracking(&self) -> &Tracking {
        &self.tracking
    }
}

impl EntityCache {
    pub fn merge_conversation(
        &self,
        session: &Did,
        view: &ConversationShape,
        tag: Option<VersionTag>,
    ) -> Rc<SignalizedConversation> {
        let members: Vec<_> = view
            .basic()
            .members
            .iter()
            .map(|m| self.merge_profile(session, &ProfileShape::Basic(m.clone()), tag))
            .collect();

        let key = EntityKey::new(session, view.id());
        let for_update = members.clone();
        self.conversations.merge(
            key,
            tag,
            |tracking| SignalizedConversation::new(session.clone(), view, members, tracking),
            |existing| existing.apply(view, for_update),
        )
    }

    pub fn merge_conversation_value(
        &self,
        session: &Did,
        value: Value,
        tag: Option<VersionTag>,
    ) -> Result<Rc<SignalizedConversation>> {
        let view = ConversationShape::from_value(value)?;
        Ok(self.merge_conversation(session, &view, tag))
    }

    pub fn get_cached_conversation(
        &self,
        session: &Did,
        id: &str,
    ) -> Option<Rc<SignalizedConversation>> {
        self.conversations.get(&EntityKey::new(session, id))
    }
}
