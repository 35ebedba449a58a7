//! Test doubles shared by the unit tests of this crate.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::anyhow;
use futures::channel::oneshot;
use serde_json::{json, Value};

use plume_cache::{EntityCache, SignalizedConversation, SignalizedList, SignalizedPost, SignalizedProfile};
use plume_shared::{AtUri, Did};

use crate::transport::Transport;

/// In-memory transport with canned responses per endpoint.
#[derive(Default)]
pub(crate) struct FakeTransport {
    responses: RefCell<HashMap<String, Value>>,
    requests: RefCell<Vec<(String, Value)>>,
    failures: RefCell<Vec<(String, usize)>>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, nsid: &str, body: Value) {
        self.responses.borrow_mut().insert(nsid.to_string(), body);
    }

    /// Make the `n`th request (0-based) to `nsid` fail.
    pub fn fail_call_number(&self, nsid: &str, n: usize) {
        self.failures.borrow_mut().push((nsid.to_string(), n));
    }

    /// Hold the next request until the returned sender fires or is dropped.
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.borrow_mut() = Some(rx);
        tx
    }

    /// Bodies of the requests made to `nsid`, in order.
    pub fn calls(&self, nsid: &str) -> Vec<Value> {
        self.requests
            .borrow()
            .iter()
            .filter(|(n, _)| n == nsid)
            .map(|(_, body)| body.clone())
            .collect()
    }

    async fn handle(&self, nsid: &str, body: Value) -> anyhow::Result<Value> {
        let index = self.calls(nsid).len();
        self.requests.borrow_mut().push((nsid.to_string(), body));

        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.failures.borrow().iter().any(|(n, i)| n == nsid && *i == index) {
            return Err(anyhow!("{nsid} failed"));
        }
        Ok(self.responses.borrow().get(nsid).cloned().unwrap_or_else(|| json!({})))
    }
}

impl Transport for FakeTransport {
    async fn get(&self, nsid: &str, params: Value) -> anyhow::Result<Value> {
        self.handle(nsid, params).await
    }

    async fn call(&self, nsid: &str, data: Value) -> anyhow::Result<Value> {
        self.handle(nsid, data).await
    }
}

// ---- Fixtures ----

pub(crate) fn me() -> Did {
    Did::parse("did:plc:me").unwrap()
}

pub(crate) fn profile_json(did: &str, handle: &str) -> Value {
    json!({ "did": did, "handle": handle })
}

pub(crate) fn post_uri(rkey: &str) -> AtUri {
    AtUri::parse(format!("at://did:plc:abc/app.bsky.feed.post/{rkey}")).unwrap()
}

pub(crate) fn post_json(rkey: &str) -> Value {
    json!({
        "uri": post_uri(rkey),
        "cid": format!("cid-{rkey}"),
        "author": profile_json("did:plc:abc", "alice"),
        "record": {"text": format!("post {rkey}"), "createdAt": "2024-01-01T00:00:00Z"},
        "likeCount": 0,
        "indexedAt": "2024-01-01T00:00:00Z"
    })
}

pub(crate) fn reply_json(rkey: &str, parent: &str, root: &str) -> Value {
    let mut post = post_json(rkey);
    post["record"]["reply"] = json!({
        "root": {"uri": post_uri(root), "cid": format!("cid-{root}")},
        "parent": {"uri": post_uri(parent), "cid": format!("cid-{parent}")}
    });
    post
}

pub(crate) fn list_uri(rkey: &str) -> AtUri {
    AtUri::parse(format!("at://did:plc:me/app.bsky.graph.list/{rkey}")).unwrap()
}

pub(crate) fn list_json(rkey: &str) -> Value {
    json!({
        "uri": list_uri(rkey),
        "cid": "c",
        "name": format!("list {rkey}"),
        "purpose": "app.bsky.graph.defs#curatelist",
        "creator": {"did": "did:plc:me", "handle": "me", "description": ""}
    })
}

pub(crate) fn convo_json(id: &str) -> Value {
    json!({
        "id": id,
        "rev": "1",
        "members": [profile_json("did:plc:me", "me"), profile_json("did:plc:abc", "alice")],
        "unreadCount": 0
    })
}

pub(crate) fn post(cache: &EntityCache, rkey: &str) -> Rc<SignalizedPost> {
    cache.merge_post_value(&me(), post_json(rkey), None).unwrap()
}

pub(crate) fn profile(cache: &EntityCache, did: &str, handle: &str) -> Rc<SignalizedProfile> {
    cache.merge_profile_value(&me(), profile_json(did, handle), None).unwrap()
}

pub(crate) fn list(cache: &EntityCache, rkey: &str) -> Rc<SignalizedList> {
    cache.merge_list_value(&me(), list_json(rkey), None).unwrap()
}

pub(crate) fn convo(cache: &EntityCache, id: &str) -> Rc<SignalizedConversation> {
    cache.merge_conversation_value(&me(), convo_json(id), None).unwrap()
}
