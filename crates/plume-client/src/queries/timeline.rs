use std::rc::Rc;

use serde_json::{json, Value};
use tracing::debug;

use plume_cache::{EntityCache, VersionTag};
use plume_shared::Did;

use super::{array, cursor, field, unexpected, with_page};
use crate::error::Result;
use crate::models::{InfiniteData, QueryData, TimelineItem, TimelinePage, TimelineReason, TimelineSlice};
use crate::query::QueryKey;
use crate::state::ClientState;
use crate::transport::{Transport, GET_TIMELINE};

const POST_VIEW: &str = "app.bsky.feed.defs#postView";
const REASON_REPOST: &str = "app.bsky.feed.defs#reasonRepost";
const REASON_PIN: &str = "app.bsky.feed.defs#reasonPin";

/// One page of the home timeline. `feed` names the timeline variant in
/// the query key (e.g. `following`).
pub async fn get_timeline<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    feed: &str,
    page_param: Option<String>,
) -> Result<Rc<InfiniteData<TimelinePage>>> {
    let key = QueryKey::timeline(session, feed);
    let data = state
        .queries
        .fetch_query(&key, || fetch_timeline(state, &key, session, page_param))
        .await?;

    match data {
        QueryData::Timeline(timeline) => Ok(timeline),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_timeline<T: Transport>(
    state: &ClientState<T>,
    key: &QueryKey,
    session: &Did,
    page_param: Option<String>,
) -> Result<QueryData> {
    let body = state
        .transport
        .get(
            GET_TIMELINE,
            json!({ "limit": state.config.page_limit, "cursor": page_param }),
        )
        .await?;

    let tag = state.cache.next_version_tag();
    let slices = array(&body, "feed")?
        .iter()
        .map(|item| timeline_slice(&state.cache, session, item, tag))
        .collect::<Result<Vec<_>>>()?;
    debug!(session = %session, slices = slices.len(), "Timeline page merged");

    let page = TimelinePage {
        cursor: cursor(&body),
        slices,
    };
    let existing = match state.queries.get_query_data(key) {
        Some(QueryData::Timeline(data)) => Some(data),
        _ => None,
    };
    Ok(QueryData::Timeline(with_page(existing, page_param, page)?))
}

/// A reply shows up under its root and parent unless it was reposted.
fn timeline_slice(
    cache: &EntityCache,
    session: &Did,
    item: &Value,
    tag: VersionTag,
) -> Result<TimelineSlice> {
    let post = cache.merge_post_value(session, field(item, "post")?.clone(), Some(tag))?;
    let reason = match item.get("reason") {
        Some(reason) => timeline_reason(cache, session, reason, tag)?,
        None => None,
    };

    let mut items: Vec<TimelineItem> = Vec::new();
    if reason.is_none() {
        if let Some(reply) = item.get("reply") {
            for context in ["root", "parent"] {
                let Some(view) = reply.get(context).filter(|v| is_post_view(v)) else {
                    continue;
                };
                let ancestor = cache.merge_post_value(session, view.clone(), Some(tag))?;
                if ancestor.uri != post.uri && !items.iter().any(|i| i.post.uri == ancestor.uri) {
                    items.push(TimelineItem {
                        post: ancestor,
                        reason: None,
                    });
                }
            }
        }
    }

    items.push(TimelineItem { post, reason });
    Ok(TimelineSlice { items })
}

fn timeline_reason(
    cache: &EntityCache,
    session: &Did,
    reason: &Value,
    tag: VersionTag,
) -> Result<Option<TimelineReason>> {
    match reason.get("$type").and_then(Value::as_str) {
        Some(REASON_REPOST) => {
            let by = cache.merge_profile_value(session, field(reason, "by")?.clone(), Some(tag))?;
            let indexed_at = reason
                .get("indexedAt")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(Some(TimelineReason::Repost { by, indexed_at }))
        }
        Some(REASON_PIN) => Ok(Some(TimelineReason::Pin)),
        _ => Ok(None),
    }
}

/// Reply context entries may be not-found or blocked stubs.
fn is_post_view(view: &Value) -> bool {
    match view.get("$type").and_then(Value::as_str) {
        Some(kind) => kind == POST_VIEW,
        None => view.get("record").is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{me, post_json, post_uri, reply_json, FakeTransport};
    use crate::ClientConfig;

    fn rkeys(slice: &TimelineSlice) -> Vec<&str> {
        slice.items.iter().map(|i| i.post.uri.rkey()).collect()
    }

    #[tokio::test]
    async fn test_timeline_slices() {
        let transport = FakeTransport::new();
        transport.respond(
            GET_TIMELINE,
            json!({
                "cursor": "c1",
                "feed": [
                    {"post": post_json("p0")},
                    {
                        "post": reply_json("p2", "p1", "root"),
                        "reply": {
                            "root": {"$type": "app.bsky.feed.defs#notFoundPost", "uri": post_uri("root"), "notFound": true},
                            "parent": post_json("p1")
                        }
                    },
                    {
                        "post": reply_json("p3", "p1", "root"),
                        "reply": {"root": post_json("root"), "parent": post_json("p1")},
                        "reason": {
                            "$type": "app.bsky.feed.defs#reasonRepost",
                            "by": {"did": "did:plc:bob", "handle": "bob"},
                            "indexedAt": "2024-01-02T00:00:00Z"
                        }
                    }
                ]
            }),
        );
        let state = ClientState::new(transport, ClientConfig::default());

        let timeline = get_timeline(&state, &me(), "following", None).await.unwrap();
        let slices = &timeline.pages[0].slices;
        assert_eq!(slices.len(), 3);
        assert_eq!(rkeys(&slices[0]), ["p0"]);
        assert_eq!(rkeys(&slices[1]), ["p1", "p2"]);
        assert_eq!(rkeys(&slices[2]), ["p3"]);
        assert!(matches!(
            &slices[2].items[0].reason,
            Some(TimelineReason::Repost { by, .. }) if by.handle.get() == "bob"
        ));

        // The parent in slice 1 is the same live post as anywhere else.
        let p1 = state.cache.get_cached_post(&me(), &post_uri("p1")).unwrap();
        assert!(Rc::ptr_eq(&slices[1].items[0].post, &p1));
    }

    #[tokio::test]
    async fn test_first_page_replaces_and_next_appends() {
        let transport = FakeTransport::new();
        transport.respond(GET_TIMELINE, json!({ "cursor": "c1", "feed": [{"post": post_json("p0")}] }));
        let state = ClientState::new(transport, ClientConfig::default());

        get_timeline(&state, &me(), "following", None).await.unwrap();
        let two = get_timeline(&state, &me(), "following", Some("c1".into())).await.unwrap();
        assert_eq!(two.pages.len(), 2);

        let fresh = get_timeline(&state, &me(), "following", None).await.unwrap();
        assert_eq!(fresh.pages.len(), 1);
    }
}
