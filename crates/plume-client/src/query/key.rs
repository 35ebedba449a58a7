//! Query keys and the filters used to address groups of them.

use std::fmt;
use std::rc::Rc;

use plume_shared::{AtUri, Did};

pub const GET_TIMELINE: &str = "getTimeline";
pub const GET_POST_THREAD: &str = "getPostThread";
pub const GET_POST: &str = "getPost";
pub const GET_PROFILE: &str = "getProfile";
pub const GET_PROFILE_FOLLOWS: &str = "getProfileFollows";
pub const GET_LIST_INFO: &str = "getListInfo";
pub const GET_LIST_MEMBERS: &str = "getListMembers";
pub const GET_LIST_MEMBERSHIPS: &str = "getListMemberships";
pub const GET_PROFILE_LISTS: &str = "getProfileLists";
pub const LIST_CONVOS: &str = "listConvos";
pub const GET_CONVO: &str = "getConvo";

/// Ordered key of a cached query: the query name, the session DID, then
/// query-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    pub fn with(mut self, part: impl fmt::Display) -> Self {
        self.0.push(part.to_string());
        self
    }

    /// `[name, session]`, the prefix shared by every query of one kind for
    /// one account.
    pub fn scope(name: &str, session: &Did) -> Self {
        Self::new(name).with(session)
    }

    pub fn name(&self) -> &str {
        &self.0[0]
    }

    pub fn part(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn timeline(session: &Did, feed: &str) -> Self {
        Self::scope(GET_TIMELINE, session).with(feed)
    }

    /// `actor` is the author as it appears in the URL (handle or DID).
    pub fn post_thread(session: &Did, actor: &str, rkey: &str) -> Self {
        Self::scope(GET_POST_THREAD, session).with(actor).with(rkey)
    }

    pub fn post(session: &Did, uri: &AtUri) -> Self {
        Self::scope(GET_POST, session).with(uri)
    }

    pub fn profile(session: &Did, actor: &str) -> Self {
        Self::scope(GET_PROFILE, session).with(actor)
    }

    pub fn profile_follows(session: &Did, actor: &str, limit: u32) -> Self {
        Self::scope(GET_PROFILE_FOLLOWS, session).with(actor).with(limit)
    }

    pub fn list_info(session: &Did, uri: &AtUri) -> Self {
        Self::scope(GET_LIST_INFO, session).with(uri)
    }

    pub fn list_members(session: &Did, uri: &AtUri, limit: u32) -> Self {
        Self::scope(GET_LIST_MEMBERS, session).with(uri).with(limit)
    }

    pub fn list_memberships(session: &Did) -> Self {
        Self::scope(GET_LIST_MEMBERSHIPS, session)
    }

    pub fn profile_lists(session: &Did, actor: &str) -> Self {
        Self::scope(GET_PROFILE_LISTS, session).with(actor)
    }

    pub fn conversations(session: &Did) -> Self {
        Self::scope(LIST_CONVOS, session)
    }

    pub fn conversation(session: &Did, id: &str) -> Self {
        Self::scope(GET_CONVO, session).with(id)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Selects cache entries by key prefix, optionally narrowed by a predicate.
#[derive(Clone)]
pub struct QueryFilter {
    key: QueryKey,
    exact: bool,
    predicate: Option<Rc<dyn Fn(&QueryKey) -> bool>>,
}

impl QueryFilter {
    pub fn prefix(key: QueryKey) -> Self {
        Self {
            key,
            exact: false,
            predicate: None,
        }
    }

    pub fn exact(key: QueryKey) -> Self {
        Self {
            key,
            exact: true,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: impl Fn(&QueryKey) -> bool + 'static) -> Self {
        self.predicate = Some(Rc::new(predicate));
        self
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        let by_key = if self.exact {
            *key == self.key
        } else {
            key.starts_with(&self.key)
        };
        by_key && self.predicate.as_ref().map_or(true, |p| p(key))
    }
}

impl fmt::Debug for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryFilter")
            .field("key", &self.key)
            .field("exact", &self.exact)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}
