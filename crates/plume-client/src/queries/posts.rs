use std::rc::Rc;

use serde_json::{json, Value};

use plume_cache::{EntityCache, SignalizedPost, VersionTag};
use plume_shared::constants::COLLECTION_POST;
use plume_shared::{AtUri, Did};

use super::{array, field, unexpected};
use crate::error::{ClientError, Result};
use crate::models::{QueryData, ThreadAncestor, ThreadData, ThreadNode};
use crate::query::QueryKey;
use crate::state::ClientState;
use crate::transport::{Transport, GET_POSTS, GET_POST_THREAD};

pub async fn get_post<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    uri: &AtUri,
) -> Result<Rc<SignalizedPost>> {
    let key = QueryKey::post(session, uri);
    let data = state
        .queries
        .fetch_query(&key, || fetch_post(state, session, uri))
        .await?;

    match data {
        QueryData::Post(post) => Ok(post),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_post<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    uri: &AtUri,
) -> Result<QueryData> {
    let body = state.transport.get(GET_POSTS, json!({ "uris": [uri] })).await?;
    let view = array(&body, "posts")?
        .first()
        .cloned()
        .ok_or_else(|| ClientError::MissingData(format!("post {uri} not found")))?;

    let tag = state.cache.next_version_tag();
    let post = state.cache.merge_post_value(session, view, Some(tag))?;
    Ok(QueryData::Post(post))
}

/// `actor` is a handle or DID; the thread is keyed by what the caller used.
pub async fn get_post_thread<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    actor: &str,
    rkey: &str,
) -> Result<Rc<ThreadData>> {
    let key = QueryKey::post_thread(session, actor, rkey);
    let uri = AtUri::parse(format!("at://{actor}/{COLLECTION_POST}/{rkey}"))?;

    let data = state
        .queries
        .fetch_query(&key, || fetch_post_thread(state, session, &uri))
        .await?;

    match data {
        QueryData::PostThread(thread) => Ok(thread),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_post_thread<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    uri: &AtUri,
) -> Result<QueryData> {
    let body = state
        .transport
        .get(GET_POST_THREAD, json!({ "uri": uri }))
        .await?;
    let thread = field(&body, "thread")?;

    let tag = state.cache.next_version_tag();
    let data = thread_data(&state.cache, session, thread, tag)?;
    Ok(QueryData::PostThread(Rc::new(data)))
}

enum NodeKind {
    Post,
    NotFound,
    Blocked,
}

fn node_kind(node: &Value) -> NodeKind {
    if node.get("notFound").and_then(Value::as_bool) == Some(true) {
        NodeKind::NotFound
    } else if node.get("blocked").and_then(Value::as_bool) == Some(true) {
        NodeKind::Blocked
    } else {
        NodeKind::Post
    }
}

fn node_uri(node: &Value) -> Result<AtUri> {
    let uri = field(node, "uri")?
        .as_str()
        .ok_or_else(|| ClientError::MissingData("thread node uri is not a string".into()))?;
    Ok(AtUri::parse(uri)?)
}

fn merge_node_post(
    cache: &EntityCache,
    session: &Did,
    node: &Value,
    tag: VersionTag,
) -> Result<Rc<SignalizedPost>> {
    Ok(cache.merge_post_value(session, field(node, "post")?.clone(), Some(tag))?)
}

fn thread_data(cache: &EntityCache, session: &Did, thread: &Value, tag: VersionTag) -> Result<ThreadData> {
    match node_kind(thread) {
        NodeKind::Post => {}
        NodeKind::NotFound | NodeKind::Blocked => {
            return Err(ClientError::MissingData(format!(
                "thread anchor {} is unavailable",
                node_uri(thread)?
            )));
        }
    }

    let post = merge_node_post(cache, session, thread, tag)?;

    let mut parents = Vec::new();
    let mut next = thread.get("parent");
    while let Some(node) = next {
        match node_kind(node) {
            NodeKind::Post => {
                parents.push(ThreadAncestor::Post(merge_node_post(cache, session, node, tag)?));
                next = node.get("parent");
            }
            NodeKind::NotFound => {
                parents.push(ThreadAncestor::NotFound(node_uri(node)?));
                break;
            }
            NodeKind::Blocked => {
                parents.push(ThreadAncestor::Blocked(node_uri(node)?));
                break;
            }
        }
    }
    parents.reverse();

    Ok(ThreadData {
        post,
        parents,
        replies: thread_replies(cache, session, thread, tag)?,
    })
}

/// Unavailable replies are left out.
fn thread_replies(
    cache: &EntityCache,
    session: &Did,
    node: &Value,
    tag: VersionTag,
) -> Result<Vec<ThreadNode>> {
    let Some(replies) = node.get("replies").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    replies
        .iter()
        .filter(|r| matches!(node_kind(r), NodeKind::Post))
        .map(|r| {
            Ok(ThreadNode {
                post: merge_node_post(cache, session, r, tag)?,
                replies: thread_replies(cache, session, r, tag)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryFilter;
    use crate::testing::{me, post_json, post_uri, reply_json, FakeTransport};
    use crate::ClientConfig;

    #[tokio::test]
    async fn test_get_post_merges_and_stores() {
        let transport = FakeTransport::new();
        transport.respond(GET_POSTS, json!({ "posts": [post_json("p1")] }));
        let state = ClientState::new(transport, ClientConfig::default());

        let post = get_post(&state, &me(), &post_uri("p1")).await.unwrap();
        let cached = state.cache.get_cached_post(&me(), &post_uri("p1")).unwrap();
        assert!(Rc::ptr_eq(&post, &cached));

        let key = QueryKey::post(&me(), &post_uri("p1"));
        assert!(matches!(state.queries.get_query_data(&key), Some(QueryData::Post(p)) if Rc::ptr_eq(&p, &post)));
    }

    #[tokio::test]
    async fn test_get_post_missing() {
        let transport = FakeTransport::new();
        transport.respond(GET_POSTS, json!({ "posts": [] }));
        let state = ClientState::new(transport, ClientConfig::default());

        let err = get_post(&state, &me(), &post_uri("gone")).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingData(_)));
    }

    #[tokio::test]
    async fn test_cancelled_fetch_does_not_merge() {
        let transport = FakeTransport::new();
        transport.respond(GET_POSTS, json!({ "posts": [post_json("p1")] }));
        let release = transport.hold_next();
        let state = ClientState::new(transport, ClientConfig::default());
        let key = QueryKey::post(&me(), &post_uri("p1"));

        let (session, uri) = (me(), post_uri("p1"));
        let fetch = get_post(&state, &session, &uri);
        let cancel = async {
            tokio::task::yield_now().await;
            state.queries.cancel_queries(&QueryFilter::exact(key.clone()));
            let _ = release.send(());
        };
        let (result, ()) = futures::join!(fetch, cancel);

        assert!(matches!(result, Err(ClientError::Cancelled)));
        assert!(state.cache.get_cached_post(&me(), &post_uri("p1")).is_none());
        assert_eq!(state.cache.stats().profiles, 0);
        assert!(state.queries.get_query_data(&key).is_none());
    }

    #[tokio::test]
    async fn test_get_post_thread() {
        let transport = FakeTransport::new();
        transport.respond(
            GET_POST_THREAD,
            json!({
                "thread": {
                    "$type": "app.bsky.feed.defs#threadViewPost",
                    "post": reply_json("anchor", "parent", "root"),
                    "parent": {
                        "post": reply_json("parent", "root", "root"),
                        "parent": {"uri": post_uri("root"), "notFound": true}
                    },
                    "replies": [
                        {"post": reply_json("r1", "anchor", "root"), "replies": []},
                        {"uri": post_uri("r2"), "blocked": true, "author": {"did": "did:plc:x"}}
                    ]
                }
            }),
        );
        let state = ClientState::new(transport, ClientConfig::default());

        let thread = get_post_thread(&state, &me(), "alice.test", "anchor").await.unwrap();
        assert_eq!(thread.post.uri, post_uri("anchor"));
        assert_eq!(thread.parents.len(), 2);
        assert!(matches!(&thread.parents[0], ThreadAncestor::NotFound(u) if *u == post_uri("root")));
        assert_eq!(thread.parents[1].uri(), &post_uri("parent"));
        assert_eq!(thread.replies.len(), 1);

        // All posts of one response share the author instance.
        let author = &thread.post.author;
        assert!(Rc::ptr_eq(author, &thread.replies[0].post.author));

        let requested = state.transport.calls(GET_POST_THREAD);
        assert_eq!(requested[0]["uri"], "at://alice.test/app.bsky.feed.post/anchor");
    }
}
