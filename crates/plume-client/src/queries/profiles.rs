use std::rc::Rc;

use serde_json::json;

use plume_cache::{moderate_profile_list, ModerationDecider, SignalizedProfile};
use plume_shared::Did;

use super::{array, cursor, field, unexpected, with_page};
use crate::error::Result;
use crate::models::{InfiniteData, ProfileFollowsPage, QueryData};
use crate::query::QueryKey;
use crate::state::ClientState;
use crate::transport::{Transport, GET_FOLLOWS, GET_PROFILE};

pub async fn get_profile<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    actor: &str,
) -> Result<Rc<SignalizedProfile>> {
    let key = QueryKey::profile(session, actor);
    let data = state
        .queries
        .fetch_query(&key, || fetch_profile(state, session, actor))
        .await?;

    match data {
        QueryData::Profile(profile) => Ok(profile),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_profile<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    actor: &str,
) -> Result<QueryData> {
    let body = state.transport.get(GET_PROFILE, json!({ "actor": actor })).await?;
    let tag = state.cache.next_version_tag();
    let profile = state.cache.merge_profile_value(session, body, Some(tag))?;
    Ok(QueryData::Profile(profile))
}

/// Fetch one page of the accounts `actor` follows. `page_param` is the
/// cursor of the page to load; `None` starts over.
pub async fn get_profile_follows<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    actor: &str,
    page_param: Option<String>,
    moderation: Option<&dyn ModerationDecider>,
) -> Result<Rc<InfiniteData<ProfileFollowsPage>>> {
    let key = QueryKey::profile_follows(session, actor, state.config.page_limit);
    let data = state
        .queries
        .fetch_query(&key, || {
            fetch_profile_follows(state, &key, session, actor, page_param, moderation)
        })
        .await?;

    match data {
        QueryData::ProfileFollows(follows) => Ok(follows),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_profile_follows<T: Transport>(
    state: &ClientState<T>,
    key: &QueryKey,
    session: &Did,
    actor: &str,
    page_param: Option<String>,
    moderation: Option<&dyn ModerationDecider>,
) -> Result<QueryData> {
    let body = state
        .transport
        .get(
            GET_FOLLOWS,
            json!({
                "actor": actor,
                "limit": state.config.page_limit,
                "cursor": page_param,
            }),
        )
        .await?;

    // Subject and follows come from one response.
    let tag = state.cache.next_version_tag();
    let subject = state
        .cache
        .merge_profile_value(session, field(&body, "subject")?.clone(), Some(tag))?;
    let profiles = array(&body, "follows")?
        .iter()
        .map(|view| state.cache.merge_profile_value(session, view.clone(), Some(tag)))
        .collect::<plume_cache::Result<Vec<_>>>()?;

    let page = ProfileFollowsPage {
        cursor: cursor(&body),
        subject,
        profiles: moderate_profile_list(profiles, moderation),
    };

    let existing = match state.queries.get_query_data(key) {
        Some(QueryData::ProfileFollows(data)) => Some(data),
        _ => None,
    };
    Ok(QueryData::ProfileFollows(with_page(existing, page_param, page)?))
}

/// Placeholder data for a follows query while it loads: the cached
/// subject profile and no follows yet.
pub fn get_initial_profile_follows<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    actor: &Did,
) -> Option<Rc<InfiniteData<ProfileFollowsPage>>> {
    let subject = state.cache.get_cached_profile(session, actor)?;
    Some(Rc::new(InfiniteData::first(ProfileFollowsPage {
        cursor: None,
        subject,
        profiles: Vec::new(),
    })))
}

#[cfg(test)]
mod tests {
    use plume_cache::moderation::ProfileModeration;
    use plume_cache::{Decision, Tracked};
    use serde_json::Value;

    use super::*;
    use crate::testing::{me, profile_json, FakeTransport};
    use crate::ClientConfig;

    fn follows_body(cursor: Option<&str>, handles: &[(&str, &str)]) -> Value {
        json!({
            "cursor": cursor,
            "subject": {"did": "did:plc:abc", "handle": "alice", "description": "bio"},
            "follows": handles
                .iter()
                .map(|(did, handle)| profile_json(did, handle))
                .collect::<Vec<_>>()
        })
    }

    #[tokio::test]
    async fn test_get_profile() {
        let transport = FakeTransport::new();
        transport.respond(
            GET_PROFILE,
            json!({"did": "did:plc:abc", "handle": "alice", "description": "hi", "postsCount": 5}),
        );
        let state = ClientState::new(transport, ClientConfig::default());

        let profile = get_profile(&state, &me(), "alice").await.unwrap();
        assert_eq!(profile.posts_count.get(), 5);
        assert_eq!(profile.description.get(), "hi");
        assert!(profile.tracking().version().is_some());
    }

    #[tokio::test]
    async fn test_follows_pages_accumulate() {
        let transport = FakeTransport::new();
        transport.respond(GET_FOLLOWS, follows_body(Some("c1"), &[("did:plc:b", "bob")]));
        let state = ClientState::new(transport, ClientConfig::default());

        let first = get_profile_follows(&state, &me(), "alice", None, None).await.unwrap();
        assert_eq!(first.pages.len(), 1);
        assert_eq!(first.pages[0].cursor.as_deref(), Some("c1"));
        assert_eq!(first.pages[0].subject.description.get(), "bio");

        state
            .transport
            .respond(GET_FOLLOWS, follows_body(None, &[("did:plc:c", "carol")]));
        let both = get_profile_follows(&state, &me(), "alice", Some("c1".into()), None)
            .await
            .unwrap();
        assert_eq!(both.pages.len(), 2);
        assert_eq!(both.page_params, [None, Some("c1".to_string())]);
        assert!(Rc::ptr_eq(&both.pages[0].subject, &both.pages[1].subject));

        let requests = state.transport.calls(GET_FOLLOWS);
        assert_eq!(requests[1]["cursor"], "c1");
        assert_eq!(requests[1]["limit"], 25);
    }

    #[tokio::test]
    async fn test_follows_are_moderated() {
        struct HideBob;
        impl ModerationDecider for HideBob {
            fn decide_profile(&self, subject: &ProfileModeration) -> Decision {
                if subject.did.as_str() == "did:plc:b" {
                    Decision::Filter
                } else {
                    Decision::Allow
                }
            }
        }

        let transport = FakeTransport::new();
        transport.respond(
            GET_FOLLOWS,
            follows_body(None, &[("did:plc:b", "bob"), ("did:plc:c", "carol")]),
        );
        let state = ClientState::new(transport, ClientConfig::default());

        let data = get_profile_follows(&state, &me(), "alice", None, Some(&HideBob))
            .await
            .unwrap();
        let handles: Vec<_> = data.pages[0].profiles.iter().map(|p| p.handle.get()).collect();
        assert_eq!(handles, ["carol"]);
    }

    #[test]
    fn test_initial_follows_from_cached_profile() {
        let state = ClientState::new(FakeTransport::new(), ClientConfig::default());
        let alice = Did::parse("did:plc:abc").unwrap();
        assert!(get_initial_profile_follows(&state, &me(), &alice).is_none());

        let profile = state
            .cache
            .merge_profile_value(&me(), profile_json("did:plc:abc", "alice"), None)
            .unwrap();
        let initial = get_initial_profile_follows(&state, &me(), &alice).unwrap();
        assert!(Rc::ptr_eq(&initial.pages[0].subject, &profile));
        assert!(initial.pages[0].profiles.is_empty());
    }
}
