//! Shapes of the results held by the query cache.
//!
//! Pages hold `Rc`s to live entities from the
//! [`EntityCache`](plume_cache::EntityCache); they never own entity state.

use std::rc::Rc;

use plume_cache::{SignalizedConversation, SignalizedList, SignalizedPost, SignalizedProfile};
use plume_shared::{AtUri, Did};

/// Paginated result: the pages fetched so far and the cursor each was
/// requested with.
#[derive(Debug, Clone)]
pub struct InfiniteData<P> {
    pub pages: Vec<P>,
    pub page_params: Vec<Option<String>>,
}

impl<P> InfiniteData<P> {
    pub fn first(page: P) -> Self {
        Self {
            pages: vec![page],
            page_params: vec![None],
        }
    }

    pub fn push(&mut self, param: Option<String>, page: P) {
        self.pages.push(page);
        self.page_params.push(param);
    }
}

// ---- Timeline ----

#[derive(Debug, Clone)]
pub struct TimelinePage {
    pub cursor: Option<String>,
    pub slices: Vec<TimelineSlice>,
}

/// Posts shown together, e.g. a reply under its parent.
#[derive(Debug, Clone)]
pub struct TimelineSlice {
    pub items: Vec<TimelineItem>,
}

#[derive(Debug, Clone)]
pub struct TimelineItem {
    pub post: Rc<SignalizedPost>,
    pub reason: Option<TimelineReason>,
}

#[derive(Debug, Clone)]
pub enum TimelineReason {
    Repost {
        by: Rc<SignalizedProfile>,
        indexed_at: String,
    },
    Pin,
}

// ---- Threads ----

#[derive(Debug, Clone)]
pub struct ThreadData {
    pub post: Rc<SignalizedPost>,
    /// Ancestors, root first.
    pub parents: Vec<ThreadAncestor>,
    pub replies: Vec<ThreadNode>,
}

#[derive(Debug, Clone)]
pub enum ThreadAncestor {
    Post(Rc<SignalizedPost>),
    NotFound(AtUri),
    Blocked(AtUri),
}

impl ThreadAncestor {
    pub fn uri(&self) -> &AtUri {
        match self {
            ThreadAncestor::Post(p) => &p.uri,
            ThreadAncestor::NotFound(uri) | ThreadAncestor::Blocked(uri) => uri,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThreadNode {
    pub post: Rc<SignalizedPost>,
    pub replies: Vec<ThreadNode>,
}

// ---- Graph ----

#[derive(Debug, Clone)]
pub struct ProfileFollowsPage {
    pub cursor: Option<String>,
    pub subject: Rc<SignalizedProfile>,
    pub profiles: Vec<Rc<SignalizedProfile>>,
}

#[derive(Debug, Clone)]
pub struct ListMembersPage {
    pub cursor: Option<String>,
    pub list: Rc<SignalizedList>,
    pub members: Vec<ListMember>,
}

#[derive(Debug, Clone)]
pub struct ListMember {
    /// URI of the list item record.
    pub uri: AtUri,
    pub profile: Rc<SignalizedProfile>,
}

/// One list item record owned by the session: `actor` is in `list_uri`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMembership {
    pub actor: Did,
    pub list_uri: AtUri,
    pub item_uri: AtUri,
}

#[derive(Debug, Clone)]
pub struct ProfileListsPage {
    pub cursor: Option<String>,
    pub lists: Vec<Rc<SignalizedList>>,
}

// ---- Chat ----

#[derive(Debug, Clone)]
pub struct ConvoListPage {
    pub cursor: Option<String>,
    pub convos: Vec<Rc<SignalizedConversation>>,
}

/// Anything the query cache can hold under a key.
#[derive(Debug, Clone)]
pub enum QueryData {
    Timeline(Rc<InfiniteData<TimelinePage>>),
    PostThread(Rc<ThreadData>),
    Post(Rc<SignalizedPost>),
    Profile(Rc<SignalizedProfile>),
    ProfileFollows(Rc<InfiniteData<ProfileFollowsPage>>),
    List(Rc<SignalizedList>),
    ListMembers(Rc<InfiniteData<ListMembersPage>>),
    ListMemberships(Rc<Vec<ListMembership>>),
    ProfileLists(Rc<InfiniteData<ProfileListsPage>>),
    Conversations(Rc<InfiniteData<ConvoListPage>>),
    Conversation(Rc<SignalizedConversation>),
}

impl QueryData {
    /// Same variant pointing at the same allocation.
    pub fn ptr_eq(&self, other: &QueryData) -> bool {
        use QueryData::*;
        match (self, other) {
            (Timeline(a), Timeline(b)) => Rc::ptr_eq(a, b),
            (PostThread(a), PostThread(b)) => Rc::ptr_eq(a, b),
            (Post(a), Post(b)) => Rc::ptr_eq(a, b),
            (Profile(a), Profile(b)) => Rc::ptr_eq(a, b),
            (ProfileFollows(a), ProfileFollows(b)) => Rc::ptr_eq(a, b),
            (List(a), List(b)) => Rc::ptr_eq(a, b),
            (ListMembers(a), ListMembers(b)) => Rc::ptr_eq(a, b),
            (ListMemberships(a), ListMemberships(b)) => Rc::ptr_eq(a, b),
            (ProfileLists(a), ProfileLists(b)) => Rc::ptr_eq(a, b),
            (Conversations(a), Conversations(b)) => Rc::ptr_eq(a, b),
            (Conversation(a), Conversation(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            QueryData::Timeline(_) => "timeline",
            QueryData::PostThread(_) => "post thread",
            QueryData::Post(_) => "post",
            QueryData::Profile(_) => "profile",
            QueryData::ProfileFollows(_) => "profile follows",
            QueryData::List(_) => "list",
            QueryData::ListMembers(_) => "list members",
            QueryData::ListMemberships(_) => "list memberships",
            QueryData::ProfileLists(_) => "profile lists",
            QueryData::Conversations(_) => "conversations",
            QueryData::Conversation(_) => "conversation",
        }
    }
}
