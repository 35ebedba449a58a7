//! # plume-cache
//!
//! In-memory identity cache for entities fetched from the server.
//!
//! Each entity kind (profile, post, list, conversation) has one
//! [`IdentityMap`] inside the [`EntityCache`] context. Merging a server view
//! returns the unique live [`Rc`](std::rc::Rc) for its key; every field is a
//! [`Signal`] so subscribers only hear about the fields that changed.
//! Entities are owned by their users, the maps keep weak references and
//! reclaim dead slots through the finalization queue in [`gc`].
//!
//! Everything here is single-threaded and synchronous.

pub mod cache;
pub mod conversations;
pub mod gc;
pub mod identity_map;
pub mod lists;
pub mod moderation;
pub mod posts;
pub mod profiles;
pub mod signal;
pub mod views;

mod error;

pub use cache::{CacheStats, EntityCache};
pub use conversations::SignalizedConversation;
pub use error::{CacheError, Result};
pub use identity_map::{EntityKind, IdentityMap, Tracked, Tracking, VersionTag};
pub use lists::SignalizedList;
pub use moderation::{moderate_profile_list, Decision, ModerationDecider};
pub use posts::SignalizedPost;
pub use profiles::{KnownFollowersState, ProfileAssociated, SignalizedProfile};
pub use signal::{Signal, Subscription};
