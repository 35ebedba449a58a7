//! Effects of completed mutations and the reducers that apply them to
//! cached query results.
//!
//! A reducer is pure: it returns a new value when the effect touches the
//! cached result and the very same `Rc` otherwise, so callers can detect
//! "unchanged" with [`Rc::ptr_eq`]. Applying an effect twice equals applying
//! it once.

mod conversations;
mod lists;
mod thread;
mod timeline;

use std::collections::BTreeSet;
use std::rc::Rc;

use plume_cache::SignalizedProfile;
use plume_shared::{AtUri, Did};

use crate::models::{InfiniteData, ListMembership, QueryData};
use crate::query::{
    QueryFilter, QueryKey, GET_LIST_INFO, GET_LIST_MEMBERS, GET_POST_THREAD, GET_PROFILE_LISTS,
    GET_TIMELINE, LIST_CONVOS,
};

/// Something that happened on the server as a result of a mutation.
#[derive(Debug, Clone)]
pub enum Effect {
    PostDeleted {
        session: Did,
        uri: AtUri,
        /// Handle of the author, for thread queries keyed by handle.
        author_handle: Option<String>,
        parent: Option<AtUri>,
    },
    ListDeleted {
        session: Did,
        uri: AtUri,
    },
    /// `actor` was added to and removed from some of the session's lists.
    MembershipsChanged {
        session: Did,
        actor: Rc<SignalizedProfile>,
        created: Vec<ListMembership>,
        removed: Vec<ListMembership>,
    },
    ConversationLeft {
        session: Did,
        id: String,
    },
}

impl Effect {
    pub fn session(&self) -> &Did {
        match self {
            Effect::PostDeleted { session, .. }
            | Effect::ListDeleted { session, .. }
            | Effect::MembershipsChanged { session, .. }
            | Effect::ConversationLeft { session, .. } => session,
        }
    }

    /// What the caller has to do to the query cache for this effect.
    pub fn plan(&self) -> MutationPlan {
        let mut plan = MutationPlan::default();

        match self {
            Effect::PostDeleted {
                session,
                uri,
                author_handle,
                parent,
                ..
            } => {
                plan.evict_posts.push(uri.clone());

                plan.reset.push(QueryFilter::exact(QueryKey::post(session, uri)));
                plan.reset.push(QueryFilter::exact(QueryKey::post_thread(
                    session,
                    uri.repo(),
                    uri.rkey(),
                )));
                if let Some(handle) = author_handle {
                    plan.reset.push(QueryFilter::exact(QueryKey::post_thread(
                        session,
                        handle,
                        uri.rkey(),
                    )));
                }

                plan.patch.push(QueryFilter::prefix(QueryKey::scope(GET_TIMELINE, session)));
                plan.patch.push(QueryFilter::prefix(QueryKey::scope(GET_POST_THREAD, session)));

                if let Some(parent) = parent {
                    plan.refetch.push(QueryKey::post(session, parent));
                }
            }
            Effect::ListDeleted { session, uri } => {
                plan.reset.push(QueryFilter::exact(QueryKey::list_info(session, uri)));
                plan.reset.push(QueryFilter::prefix(
                    QueryKey::scope(GET_LIST_MEMBERS, session).with(uri),
                ));

                plan.patch.push(QueryFilter::exact(QueryKey::list_memberships(session)));
                plan.patch.push(QueryFilter::prefix(QueryKey::scope(GET_PROFILE_LISTS, session)));
            }
            Effect::MembershipsChanged {
                session,
                actor,
                created,
                removed,
            } => {
                plan.patch.push(QueryFilter::exact(QueryKey::list_memberships(session)));

                let touched: BTreeSet<String> = created
                    .iter()
                    .chain(removed)
                    .map(|m| m.list_uri.to_string())
                    .collect();
                let members_touched = touched.clone();
                plan.patch.push(
                    QueryFilter::prefix(QueryKey::scope(GET_LIST_MEMBERS, session))
                        .with_predicate(move |k| k.part(2).is_some_and(|l| members_touched.contains(l))),
                );
                plan.invalidate.push(
                    QueryFilter::prefix(QueryKey::scope(GET_LIST_INFO, session))
                        .with_predicate(move |k| k.part(2).is_some_and(|l| touched.contains(l))),
                );
                plan.invalidate.push(QueryFilter::exact(QueryKey::profile(
                    session,
                    actor.did.as_str(),
                )));
            }
            Effect::ConversationLeft { session, id } => {
                plan.reset.push(QueryFilter::exact(QueryKey::conversation(session, id)));
                plan.patch.push(QueryFilter::prefix(QueryKey::scope(LIST_CONVOS, session)));
            }
        }

        plan
    }
}

/// Cache operations derived from an [`Effect`].
#[derive(Debug, Default)]
pub struct MutationPlan {
    /// Posts to evict from the entity cache right away.
    pub evict_posts: Vec<AtUri>,
    /// Queries keyed by the affected entity itself; dropped, not patched.
    pub reset: Vec<QueryFilter>,
    /// Queries that may contain the entity; the effect is reduced into them.
    pub patch: Vec<QueryFilter>,
    /// Queries to mark stale.
    pub invalidate: Vec<QueryFilter>,
    /// Dependent queries the caller should fetch again.
    pub refetch: Vec<QueryKey>,
}

impl MutationPlan {
    /// Plan for a chunked membership write that partly failed: the remote
    /// state is unknown, so everything it could have touched is invalidated.
    pub fn memberships_unknown(session: &Did, actor: &Did) -> Self {
        Self {
            invalidate: vec![
                QueryFilter::exact(QueryKey::list_memberships(session)),
                QueryFilter::prefix(QueryKey::scope(GET_LIST_MEMBERS, session)),
                QueryFilter::prefix(QueryKey::scope(GET_LIST_INFO, session)),
                QueryFilter::exact(QueryKey::profile(session, actor.as_str())),
            ],
            ..Self::default()
        }
    }
}

/// A cached result an [`Effect`] can be reduced into.
pub trait Reduce {
    /// Returns `this` itself when the effect does not apply.
    fn reduce(this: &Rc<Self>, effect: &Effect) -> Rc<Self>;
}

/// Rebuild `data` with the pages `f` changed. `f` returns `None` for pages
/// it leaves alone; if no page changed the original `Rc` is returned.
pub(crate) fn map_pages<P: Clone>(
    data: &Rc<InfiniteData<P>>,
    mut f: impl FnMut(usize, &P) -> Option<P>,
) -> Rc<InfiniteData<P>> {
    let mut changed = false;
    let pages = data
        .pages
        .iter()
        .enumerate()
        .map(|(i, page)| match f(i, page) {
            Some(next) => {
                changed = true;
                next
            }
            None => page.clone(),
        })
        .collect();

    if !changed {
        return Rc::clone(data);
    }
    Rc::new(InfiniteData {
        pages,
        page_params: data.page_params.clone(),
    })
}

impl QueryData {
    /// Apply `effect` to whatever shape this entry holds. Single-entity
    /// entries are live already and come back unchanged.
    pub fn reduce(&self, effect: &Effect) -> QueryData {
        match self {
            QueryData::Timeline(d) => QueryData::Timeline(Reduce::reduce(d, effect)),
            QueryData::PostThread(d) => QueryData::PostThread(Reduce::reduce(d, effect)),
            QueryData::ListMembers(d) => QueryData::ListMembers(Reduce::reduce(d, effect)),
            QueryData::ListMemberships(d) => QueryData::ListMemberships(Reduce::reduce(d, effect)),
            QueryData::ProfileLists(d) => QueryData::ProfileLists(Reduce::reduce(d, effect)),
            QueryData::Conversations(d) => QueryData::Conversations(Reduce::reduce(d, effect)),
            QueryData::Post(_)
            | QueryData::Profile(_)
            | QueryData::ProfileFollows(_)
            | QueryData::List(_)
            | QueryData::Conversation(_) => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use plume_cache::EntityCache;

    use super::*;
    use crate::testing::{list_uri, me, post_uri, profile};

    #[test]
    fn test_post_deleted_plan() {
        let effect = Effect::PostDeleted {
            session: me(),
            uri: post_uri("p1"),
            author_handle: Some("alice.test".into()),
            parent: Some(post_uri("p0")),
        };
        let plan = effect.plan();

        assert_eq!(plan.evict_posts, [post_uri("p1")]);
        assert!(plan.reset.iter().any(|f| f.matches(&QueryKey::post(&me(), &post_uri("p1")))));
        assert!(plan
            .reset
            .iter()
            .any(|f| f.matches(&QueryKey::post_thread(&me(), "alice.test", "p1"))));
        assert!(plan
            .reset
            .iter()
            .any(|f| f.matches(&QueryKey::post_thread(&me(), "did:plc:abc", "p1"))));
        assert!(!plan
            .reset
            .iter()
            .any(|f| f.matches(&QueryKey::post_thread(&me(), "did:plc:abc", "p0"))));

        assert!(plan.patch.iter().any(|f| f.matches(&QueryKey::timeline(&me(), "following"))));
        assert_eq!(plan.refetch, [QueryKey::post(&me(), &post_uri("p0"))]);
    }

    #[test]
    fn test_memberships_plan_targets_touched_lists() {
        let cache = EntityCache::with_sweep_interval(0);
        let actor = profile(&cache, "did:plc:abc", "alice");
        let effect = Effect::MembershipsChanged {
            session: me(),
            actor: Rc::clone(&actor),
            created: vec![ListMembership {
                actor: actor.did.clone(),
                list_uri: list_uri("a"),
                item_uri: AtUri::parse("at://did:plc:me/app.bsky.graph.listitem/1").unwrap(),
            }],
            removed: vec![],
        };
        let plan = effect.plan();

        let members = |list: &str| QueryKey::list_members(&me(), &list_uri(list), 25);
        assert!(plan.patch.iter().any(|f| f.matches(&members("a"))));
        assert!(!plan.patch.iter().any(|f| f.matches(&members("b"))));
        assert!(plan
            .invalidate
            .iter()
            .any(|f| f.matches(&QueryKey::profile(&me(), "did:plc:abc"))));
    }

    #[test]
    fn test_entity_entries_are_not_reduced() {
        let cache = EntityCache::with_sweep_interval(0);
        let data = QueryData::Profile(profile(&cache, "did:plc:abc", "alice"));
        let effect = Effect::ConversationLeft {
            session: me(),
            id: "c".into(),
        };
        assert!(data.reduce(&effect).ptr_eq(&data));
    }
}
