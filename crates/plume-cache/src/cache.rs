//! The cache context: one identity map per entity kind.
//!
//! The per-kind merge entry points live next to their entity types
//! (`profiles.rs`, `posts.rs`, ...), each adding an `impl EntityCache` block.

use std::cell::Cell;

use plume_shared::constants::DEFAULT_SWEEP_INTERVAL;

use crate::conversations::SignalizedConversation;
use crate::identity_map::{EntityKind, IdentityMap, VersionTag};
use crate::lists::SignalizedList;
use crate::posts::SignalizedPost;
use crate::profiles::SignalizedProfile;

#[derive(Debug)]
pub struct EntityCache {
    pub(crate) profiles: IdentityMap<SignalizedProfile>,
    pub(crate) posts: IdentityMap<SignalizedPost>,
    pub(crate) lists: IdentityMap<SignalizedList>,
    pub(crate) conversations: IdentityMap<SignalizedConversation>,
    last_tag: Cell<u64>,
}

/// Slot counts per map, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub profiles: usize,
    pub posts: usize,
    pub lists: usize,
    pub conversations: usize,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    /// `sweep_interval` merges per map between automatic sweeps; 0 disables them.
    pub fn with_sweep_interval(sweep_interval: u32) -> Self {
        Self {
            profiles: IdentityMap::new(EntityKind::Profile, sweep_interval),
            posts: IdentityMap::new(EntityKind::Post, sweep_interval),
            lists: IdentityMap::new(EntityKind::List, sweep_interval),
            conversations: IdentityMap::new(EntityKind::Conversation, sweep_interval),
            last_tag: Cell::new(0),
        }
    }

    /// Mint a tag for one logical server response.
    ///
    /// Every merge performed while handling that response should pass the
    /// same tag; no two calls ever return the same tag.
    pub fn next_version_tag(&self) -> VersionTag {
        let next = self.last_tag.get() + 1;
        self.last_tag.set(next);
        VersionTag(next)
    }

    /// Reclaim finalized slots in every map. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.profiles.sweep() + self.posts.sweep() + self.lists.sweep() + self.conversations.sweep()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            profiles: self.profiles.len(),
            posts: self.posts.len(),
            lists: self.lists.len(),
            conversations: self.conversations.len(),
        }
    }

    pub fn profiles(&self) -> &IdentityMap<SignalizedProfile> {
        &self.profiles
    }

    pub fn posts(&self) -> &IdentityMap<SignalizedPost> {
        &self.posts
    }

    pub fn lists(&self) -> &IdentityMap<SignalizedList> {
        &self.lists
    }

    pub fn conversations(&self) -> &IdentityMap<SignalizedConversation> {
        &self.conversations
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}
