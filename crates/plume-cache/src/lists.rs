//! Signalized lists (curation and moderation lists).

use std::rc::Rc;

use serde_json::Value;

use plume_shared::{AtUri, Did, EntityKey};

use crate::cache::EntityCache;
use crate::error::Result;
use crate::identity_map::{Tracked, Tracking, VersionTag};
use crate::profiles::SignalizedProfile;
use crate::signal::{same_rc, Signal};
use crate::views::{Label, ListShape, ListViewBasic, ProfileShape};

/// Purpose value of moderation lists.
pub const LIST_PURPOSE_MODLIST: &str = "app.bsky.graph.defs#modlist";

#[derive(Debug)]
pub struct ListViewerSignals {
    pub muted: Signal<bool>,
    pub blocked: Signal<Option<AtUri>>,
}

#[derive(Debug)]
pub struct SignalizedList {
    pub session: Did,
    pub uri: AtUri,
    pub cid: Signal<String>,
    pub name: Signal<String>,
    pub purpose: Signal<String>,
    pub avatar: Signal<Option<String>>,
    pub item_count: Signal<u64>,
    pub labels: Signal<Vec<Label>>,
    /// Empty until a full view has been merged.
    pub description: Signal<String>,
    /// `None` until a full view has been merged.
    pub creator: Signal<Option<Rc<SignalizedProfile>>>,
    pub viewer: ListViewerSignals,
    tracking: Tracking,
}

impl SignalizedList {
    fn new(
        session: Did,
        view: &ListShape,
        creator: Option<Rc<SignalizedProfile>>,
        tracking: Tracking,
    ) -> Self {
        let basic = view.basic();
        let viewer = basic.viewer.clone().unwrap_or_default();
        let description = match view {
            ListShape::Full(l) => l.description.clone().unwrap_or_default(),
            ListShape::Basic(_) => String::new(),
        };

        Self {
            session,
            uri: basic.uri.clone(),
            cid: Signal::new(basic.cid.clone()),
            name: Signal::new(basic.name.clone()),
            purpose: Signal::new(basic.purpose.clone()),
            avatar: Signal::new(basic.avatar.clone()),
            item_count: Signal::new(basic.list_item_count.unwrap_or(0)),
            labels: Signal::new(basic.labels.clone().unwrap_or_default()),
            description: Signal::new(description),
            creator: Signal::with_equality(creator, same_rc),
            viewer: ListViewerSignals {
                muted: Signal::new(viewer.muted.unwrap_or(false)),
                blocked: Signal::new(viewer.blocked),
            },
            tracking,
        }
    }

    fn apply(&self, view: &ListShape, creator: Option<Rc<SignalizedProfile>>) {
        let basic: &ListViewBasic = view.basic();
        let viewer = basic.viewer.clone().unwrap_or_default();

        self.cid.set(basic.cid.clone());
        self.name.set(basic.name.clone());
        self.purpose.set(basic.purpose.clone());
        self.avatar.set(basic.avatar.clone());
        self.item_count.set(basic.list_item_count.unwrap_or(0));
        self.labels.set(basic.labels.clone().unwrap_or_default());
        self.viewer.muted.set(viewer.muted.unwrap_or(false));
        self.viewer.blocked.set(viewer.blocked);

        if let ListShape::Full(l) = view {
            self.description.set(l.description.clone().unwrap_or_default());
            self.creator.set(creator);
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.session, self.uri.as_str())
    }

    pub fn is_moderation_list(&self) -> bool {
        *self.purpose.peek() == LIST_PURPOSE_MODLIST
    }
}

impl Tracked for SignalizedList {
    fn tracking(&self) -> &Tracking {
        &self.tracking
    }
}

impl EntityCache {
    pub fn merge_list(
        &self,
        session: &Did,
        view: &ListShape,
        tag: Option<VersionTag>,
    ) -> Rc<SignalizedList> {
        let creator = match view {
            ListShape::Full(l) => {
                let shape = ProfileShape::Standard(l.creator.clone());
                Some(self.merge_profile(session, &shape, tag))
            }
            ListShape::Basic(_) => None,
        };

        let key = EntityKey::new(session, view.uri().as_str());
        let for_update = creator.clone();
        self.lists.merge(
            key,
            tag,
            |tracking| SignalizedList::new(session.clone(), view, creator, tracking),
            |existing| existing.apply(view, for_update),
        )
    }

    pub fn merge_list_value(
        &self,
        session: &Did,
        value: Value,
        tag: Option<VersionTag>,
    ) -> Result<Rc<SignalizedList>> {
        let view = ListShape::from_value(value)?;
        Ok(self.merge_list(session, &view, tag))
    }

    pub fn get_cached_list(&self, session: &Did, uri: &AtUri) -> Option<Rc<SignalizedList>> {
        self.lists.get(&EntityKey::new(session, uri.as_str()))
    }
}
