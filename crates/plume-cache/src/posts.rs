//! Signalized posts.
//!
//! The author is merged through the profile map with the post's version
//! tag, so a post always points at the canonical profile instance. Counts,
//! viewer state, embed and threadgate are only carried by the full shape.

use std::rc::Rc;

use serde_json::Value;

use plume_shared::{AtUri, Did, EntityKey};

use crate::cache::EntityCache;
use crate::error::Result;
use crate::identity_map::{Tracked, Tracking, VersionTag};
use crate::profiles::SignalizedProfile;
use crate::signal::Signal;
use crate::views::{Label, PostRecord, PostShape, PostViewerState, ProfileShape};

#[derive(Debug)]
pub struct PostViewerSignals {
    pub like: Signal<Option<AtUri>>,
    pub repost: Signal<Option<AtUri>>,
    pub thread_muted: Signal<bool>,
    pub reply_disabled: Signal<bool>,
}

impl PostViewerSignals {
    fn new(viewer: Option<&PostViewerState>) -> Self {
        let viewer = viewer.cloned().unwrap_or_default();
        Self {
            like: Signal::new(viewer.like),
            repost: Signal::new(viewer.repost),
            thread_muted: Signal::new(viewer.thread_muted.unwrap_or(false)),
            reply_disabled: Signal::new(viewer.reply_disabled.unwrap_or(false)),
        }
    }

    fn apply(&self, viewer: Option<&PostViewerState>) {
        let viewer = viewer.cloned().unwrap_or_default();
        self.like.set(viewer.like);
        self.repost.set(viewer.repost);
        self.thread_muted.set(viewer.thread_muted.unwrap_or(false));
        self.reply_disabled.set(viewer.reply_disabled.unwrap_or(false));
    }
}

#[derive(Debug)]
pub struct SignalizedPost {
    pub session: Did,
    pub uri: AtUri,
    pub author: Rc<SignalizedProfile>,
    pub cid: Signal<String>,
    pub record: Signal<PostRecord>,
    pub embed: Signal<Option<Value>>,
    pub reply_count: Signal<u64>,
    pub repost_count: Signal<u64>,
    pub like_count: Signal<u64>,
    pub quote_count: Signal<u64>,
    pub labels: Signal<Vec<Label>>,
    pub indexed_at: Signal<String>,
    pub threadgate: Signal<Option<Value>>,
    pub viewer: PostViewerSignals,
    tracking: Tracking,
}

impl SignalizedPost {
    fn new(
        session: Did,
        view: &PostShape,
        author: Rc<SignalizedProfile>,
        tracking: Tracking,
    ) -> Self {
        let full = match view {
            PostShape::Full(p) => Some(p),
            PostShape::Embedded(_) => None,
        };

        Self {
            session,
            uri: view.uri().clone(),
            author,
            cid: Signal::new(view.cid().to_string()),
            record: Signal::new(view.record().clone()),
            embed: Signal::new(full.and_then(|p| p.embed.clone())),
            reply_count: Signal::new(full.and_then(|p| p.reply_count).unwrap_or(0)),
            repost_count: Signal::new(full.and_then(|p| p.repost_count).unwrap_or(0)),
            like_count: Signal::new(full.and_then(|p| p.like_count).unwrap_or(0)),
            quote_count: Signal::new(full.and_then(|p| p.quote_count).unwrap_or(0)),
            labels: Signal::new(view.labels().map(<[Label]>::to_vec).unwrap_or_default()),
            indexed_at: Signal::new(view.indexed_at().to_string()),
            threadgate: Signal::new(full.and_then(|p| p.threadgate.clone())),
            viewer: PostViewerSignals::new(full.and_then(|p| p.viewer.as_ref())),
            tracking,
        }
    }

    fn apply(&self, view: &PostShape) {
        self.cid.set(view.cid().to_string());
        self.record.set(view.record().clone());
        self.labels
            .set(view.labels().map(<[Label]>::to_vec).unwrap_or_default());
        self.indexed_at.set(view.indexed_at().to_string());

        if let PostShape::Full(p) = view {
            self.embed.set(p.embed.clone());
            self.reply_count.set(p.reply_count.unwrap_or(0));
            self.repost_count.set(p.repost_count.unwrap_or(0));
            self.like_count.set(p.like_count.unwrap_or(0));
            self.quote_count.set(p.quote_count.unwrap_or(0));
            self.threadgate.set(p.threadgate.clone());
            self.viewer.apply(p.viewer.as_ref());
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::new(&self.session, self.uri.as_str())
    }

    /// URI of the post this one replies to.
    pub fn parent_uri(&self) -> Option<AtUri> {
        self.record.peek().reply.as_ref().map(|r| r.parent.uri.clone())
    }

    /// URI of the thread root, if this post is a reply.
    pub fn root_uri(&self) -> Option<AtUri> {
        self.record.peek().reply.as_ref().map(|r| r.root.uri.clone())
    }
}

impl Tracked for SignalizedPost {
    fn tracking(&self) -> &Tracking {
        &self.tracking
    }
}

impl EntityCache {
    pub fn merge_post(
        &self,
        session: &Did,
        view: &PostShape,
        tag: Option<VersionTag>,
    ) -> Rc<SignalizedPost> {
        let author_view = ProfileShape::Basic(view.author().clone());
        let author = self.merge_profile(session, &author_view, tag);

        let key = EntityKey::new(session, view.uri().as_str());
        self.posts.merge(
            key,
            tag,
            |tracking| SignalizedPost::new(session.clone(), view, author, tracking),
            |existing| existing.apply(view),
        )
    }

    pub fn merge_post_value(
        &self,
        session: &Did,
        value: Value,
        tag: Option<VersionTag>,
    ) -> Result<Rc<SignalizedPost>> {
        let view = PostShape::from_value(value)?;
        Ok(self.merge_post(session, &view, tag))
    }

    pub fn get_cached_post(&self, session: &Did, uri: &AtUri) -> Option<Rc<SignalizedPost>> {
        self.posts.get(&EntityKey::new(session, uri.as_str()))
    }

    /// Evict a post whose record was deleted, without waiting for collection.
    pub fn remove_cached_post(&self, session: &Did, uri: &AtUri) -> bool {
        self.posts.remove(&EntityKey::new(session, uri.as_str()))
    }
}
