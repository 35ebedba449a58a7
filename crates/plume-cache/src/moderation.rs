//! Moderation-relevant snapshots of live entities.
//!
//! The scoring itself belongs to an external decider; this module only
//! captures the inputs it needs from the current signal values and applies
//! its verdict to lists of profiles.

use std::rc::Rc;

use plume_shared::Did;

use crate::posts::SignalizedPost;
use crate::profiles::SignalizedProfile;
use crate::views::Label;

/// Point-in-time moderation inputs for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileModeration {
    pub did: Did,
    pub labels: Vec<Label>,
    pub muted: bool,
    pub muted_by_list: bool,
    pub blocking: bool,
    pub blocking_by_list: bool,
    pub blocked_by: bool,
}

/// Point-in-time moderation inputs for one post and its author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostModeration {
    pub author: ProfileModeration,
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Show behind an interstitial.
    Warn,
    /// Remove from lists entirely.
    Filter,
}

pub trait ModerationDecider {
    fn decide_profile(&self, subject: &ProfileModeration) -> Decision;

    fn decide_post(&self, subject: &PostModeration) -> Decision {
        self.decide_profile(&subject.author)
    }
}

impl SignalizedProfile {
    pub fn moderation_subject(&self) -> ProfileModeration {
        ProfileModeration {
            did: self.did.clone(),
            labels: self.labels.get(),
            muted: self.viewer.muted.get(),
            muted_by_list: self.viewer.muted_by_list.peek().is_some(),
            blocking: self.viewer.blocking.peek().is_some(),
            blocking_by_list: self.viewer.blocking_by_list.peek().is_some(),
            blocked_by: self.viewer.blocked_by.get(),
        }
    }
}

impl SignalizedPost {
    pub fn moderation_subject(&self) -> PostModeration {
        PostModeration {
            author: self.author.moderation_subject(),
            labels: self.labels.get(),
        }
    }
}

/// Drop profiles the decider filters out. Without a decider the list is
/// returned as is.
pub fn moderate_profile_list(
    profiles: Vec<Rc<SignalizedProfile>>,
    decider: Option<&dyn ModerationDecider>,
) -> Vec<Rc<SignalizedProfile>> {
    let Some(decider) = decider else {
        return profiles;
    };

    profiles
        .into_iter()
        .filter(|p| decider.decide_profile(&p.moderation_subject()) != Decision::Filter)
        .collect()
}
