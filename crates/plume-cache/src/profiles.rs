//! Signalized profiles and the profile merge protocol.
//!
//! Handle, display name, avatar, labels and the basic viewer flags are sent
//! with every shape and always overwritten. Description is only overwritten
//! by standard or detailed views; banner, counts and known followers only by
//! detailed views. `associated` is replaced wholesale by detailed views and
//! merged field-by-field from leaner ones.

use std::rc::Rc;

use serde_json::Value;

use plume_shared::{AtUri, Did, EntityKey};

use crate::cache::EntityCache;
use crate::error::Result;
use crate::identity_map::{Tracked, Tracking, VersionTag};
use crate::signal::Signal;
use crate::views::{
    ChatAssociationView, KnownFollowers, Label, ListViewBasic, ProfileAssociatedView,
    ProfileShape, ProfileViewerState,
};

/// Fully resolved "associated" metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileAssociated {
    pub lists: u64,
    pub feedgens: u64,
    pub starter_packs: u64,
    pub labeler: bool,
    pub chat: ChatAssociationView,
}

impl ProfileAssociated {
    /// Fill every missing field with its default.
    pub fn resolve(view: Option<&ProfileAssociatedView>) -> Self {
        let view = view.cloned().unwrap_or_default();
        Self {
            lists: view.lists.unwrap_or(0),
            feedgens: view.feedgens.unwrap_or(0),
            starter_packs: view.starter_packs.unwrap_or(0),
            labeler: view.labeler.unwrap_or(false),
            chat: view.chat.unwrap_or_default(),
        }
    }

    /// Overlay the fields present in `incoming` on top of `self`.
    pub fn merged(&self, incoming: Option<&ProfileAssociatedView>) -> Self {
        let Some(incoming) = incoming else {
            return self.clone();
        };

        Self {
            lists: incoming.lists.unwrap_or(self.lists),
            feedgens: incoming.feedgens.unwrap_or(self.feedgens),
            starter_packs: incoming.starter_packs.unwrap_or(self.starter_packs),
            labeler: incoming.labeler.unwrap_or(self.labeler),
            chat: incoming.chat.clone().unwrap_or_else(|| self.chat.clone()),
        }
    }
}

/// Known-followers state; only the detailed shape carries it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnownFollowersState {
    NotLoaded,
    Loaded(Option<KnownFollowers>),
}

#[derive(Debug)]
pub struct ProfileViewerSignals {
    pub muted: Signal<bool>,
    pub muted_by_list: Signal<Option<ListViewBasic>>,
    pub blocked_by: Signal<bool>,
    pub blocking: Signal<Option<AtUri>>,
    pub blocking_by_list: Signal<Option<ListViewBasic>>,
    pub following: Signal<Option<AtUri>>,
    pub followed_by: Signal<Option<AtUri>>,
    pub known_followers: Signal<KnownFollowersState>,
}

impl ProfileViewerSignals {
    fn new(viewer: Option<&ProfileViewerState>, detailed: bool) -> Self {
        let viewer = viewer.cloned().unwrap_or_default();
        Self {
            muted: Signal::new(viewer.muted.unwrap_or(false)),
            muted_by_list: Signal::new(viewer.muted_by_list),
            blocked_by: Signal::new(viewer.blocked_by.unwrap_or(false)),
            blocking: Signal::new(viewer.blocking),
            blocking_by_list: Signal::new(viewer.blocking_by_list),
            following: Signal::new(viewer.following),
            followed_by: Signal::new(viewer.followed_by),
            known_followers: Signal::new(if detailed {
                KnownFollowersState::Loaded(viewer.known_followers)
            } else {
                KnownFollowersState::NotLoaded
            }),
        }
    }

    fn apply_basic(&self, viewer: Option<&ProfileViewerState>) {
        let viewer = viewer.cloned().unwrap_or_default();
        self.muted.set(viewer.muted.unwrap_or(false));
        self.muted_by_list.set(viewer.muted_by_list);
        self.blocked_by.set(viewer.blocked_by.unwrap_or(false));
        self.blocking.set(viewer.blocking);
        self.blocking_by_list.set(viewer.blocking_by_list);
        self.following.set(viewer.following);
        self.followed_by.set(viewer.followed_by);
    }
}

#[derive(Debug)]
pub struct SignalizedProfile {
    /// Session this instance belongs to.
    pub session: Did,
    pub did: Did,
    pub handle: Signal<String>,
    pub display_name: Signal<Option<String>>,
    pub description: Signal<String>,
    pub avatar: Signal<Option<String>>,
    pub banner: Signal<Option<String>>,
    pub followers_count: Signal<u64>,
    pub follows_count: Signal<u64>,
    pub posts_count: Signal<u64>,
    pub associated: Signal<ProfileAssociated>,
    pub labels: Signal<Vec<Label>>,
    pub viewer: ProfileViewerSignals,
    tracking: Tracking,
}

impl SignalizedProfile {
    fn new(session: Did, view: &ProfileShape, tracking: Tracking) -> Self {
        let basic = view.basic();
        let detailed = view.detailed();

        Self {
            session,
            did: basic.did.clone(),
            handle: Signal::new(basic.handle.clone()),
            display_name: Signal::new(basic.display_name.clone()),
            description: Signal::new(view.description().unwrap_or_default().to_string()),
            avatar: Signal::new(basic.avatar.clone()),
            banner: Signal::new(detailed.and_then(|d| d.banner.clone())),
            followers_count: Signal::new(detailed.and_then(|d| d.followers_count).unwrap_or(0)),
            follows_count: Signal::new(detailed.and_then(|d| d.follows_count).unwrap_or(0)),
            posts_count: Signal::new(detailed.and_then(|d| d.posts_count).unwrap_or(0)),
            associated: Signal::new(ProfileAssociated::resolve(basic.associated.as_ref())),
            labels: Signal::new(basic.labels.clone().unwrap_or_default()),
            viewer: ProfileViewerSignals::new(basic.viewer.as_ref(), detailed.is_some()),
            tracking,
        }
    }

    fn apply(&self, view: &ProfileShape) {
        let basic = view.basic();

        self.handle.set(basic.handle.clone());
        self.display_name.set(basic.display_name.clone());
        self.avatar.set(basic.avatar.clone());
        self.labels.set(basic.labels.clone().unwrap_or_default());
        self.viewer.apply_basic(basic.viewer.as_ref());

        if let Some(description) = view.description() {
            self.description.set(description.to_string());
        }

        if let Some(detailed) = view.detailed() {
            self.banner.set(detailed.banner.clone());
            self.followers_count.set(detailed.followers_count.unwrap_or(0));
            self.follows_count.set(detailed.follows_count.unwrap_or(0));
            self.posts_count.set(detailed.posts_count.unwrap_or(0));
            self.associated
                .set(ProfileAssociated::resolve(basic.associated.as_ref()));
            self.viewer.known_followers.set(KnownFollowersState::Loaded(
                basic.viewer.as_ref().and_then(|v| v.known_followers.clone()),
            ));
        } else {
            let merged = self.associated.peek().merged(basic.associated.as_ref());
            self.associated.set(merged);
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.session, self.did.as_str())
    }
}

impl Tracked for SignalizedProfile {
    fn tracking(&self) -> &Tracking {
        &self.tracking
    }
}

impl EntityCache {
    /// Merge a profile view into the cache and return the live instance.
    pub fn merge_profile(
        &self,
        session: &Did,
        view: &ProfileShape,
        tag: Option<VersionTag>,
    ) -> Rc<SignalizedProfile> {
        let key = EntityKey::new(session, view.did().as_str());
        self.profiles.merge(
            key,
            tag,
            |tracking| SignalizedProfile::new(session.clone(), view, tracking),
            |existing| existing.apply(view),
        )
    }

    /// Classify a raw server view, then merge it.
    pub fn merge_profile_value(
        &self,
        session: &Did,
        value: Value,
        tag: Option<VersionTag>,
    ) -> Result<Rc<SignalizedProfile>> {
        let view = ProfileShape::from_value(value)?;
        Ok(self.merge_profile(session, &view, tag))
    }

    pub fn get_cached_profile(&self, session: &Did, actor: &Did) -> Option<Rc<SignalizedProfile>> {
        self.profiles.get(&EntityKey::new(session, actor.as_str()))
    }
}
