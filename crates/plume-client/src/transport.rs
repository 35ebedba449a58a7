//! The network seam.
//!
//! The client never talks HTTP itself; it hands endpoint names and JSON
//! bodies to a [`Transport`] and consumes the JSON it returns.

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use plume_shared::constants::COLLECTION_LIST_ITEM;
use plume_shared::{AtUri, Did, Tid};

use crate::error::{ClientError, Result};

pub const GET_TIMELINE: &str = "app.bsky.feed.getTimeline";
pub const GET_POSTS: &str = "app.bsky.feed.getPosts";
pub const GET_POST_THREAD: &str = "app.bsky.feed.getPostThread";
pub const GET_PROFILE: &str = "app.bsky.actor.getProfile";
pub const GET_FOLLOWS: &str = "app.bsky.graph.getFollows";
pub const GET_LIST: &str = "app.bsky.graph.getList";
pub const GET_LISTS: &str = "app.bsky.graph.getLists";
pub const LIST_CONVOS: &str = "chat.bsky.convo.listConvos";
pub const GET_CONVO: &str = "chat.bsky.convo.getConvo";
pub const LEAVE_CONVO: &str = "chat.bsky.convo.leaveConvo";
pub const LIST_RECORDS: &str = "com.atproto.repo.listRecords";
pub const DELETE_RECORD: &str = "com.atproto.repo.deleteRecord";
pub const APPLY_WRITES: &str = "com.atproto.repo.applyWrites";

/// Request/response collaborator, usually an XRPC client.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Query endpoint (`GET /xrpc/<nsid>`).
    async fn get(&self, nsid: &str, params: Value) -> anyhow::Result<Value>;

    /// Procedure endpoint (`POST /xrpc/<nsid>`).
    async fn call(&self, nsid: &str, data: Value) -> anyhow::Result<Value>;
}

/// One entry of an `applyWrites` batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "$type")]
pub enum WriteOp {
    #[serde(rename = "com.atproto.repo.applyWrites#create")]
    Create {
        collection: String,
        rkey: String,
        value: Value,
    },
    #[serde(rename = "com.atproto.repo.applyWrites#delete")]
    Delete { collection: String, rkey: String },
}

impl WriteOp {
    /// A new list item adding `subject` to `list`, with the URI it will get.
    pub fn create_list_item(repo: &Did, list: &AtUri, subject: &Did) -> (Self, AtUri) {
        let rkey = Tid::now();
        let uri = AtUri::new(repo, COLLECTION_LIST_ITEM, rkey.as_str());
        let op = WriteOp::Create {
            collection: COLLECTION_LIST_ITEM.to_string(),
            rkey: rkey.as_str().to_string(),
            value: json!({
                "$type": COLLECTION_LIST_ITEM,
                "list": list,
                "subject": subject,
                "createdAt": chrono::Utc::now().to_rfc3339(),
            }),
        };
        (op, uri)
    }

    /// Deletion of the record at `uri`.
    pub fn delete(uri: &AtUri) -> Self {
        WriteOp::Delete {
            collection: uri.collection().to_string(),
            rkey: uri.rkey().to_string(),
        }
    }
}

/// Delete a single record from `repo`.
pub async fn delete_record<T: Transport>(transport: &T, repo: &Did, uri: &AtUri) -> Result<()> {
    transport
        .call(
            DELETE_RECORD,
            json!({
                "repo": repo,
                "collection": uri.collection(),
                "rkey": uri.rkey(),
            }),
        )
        .await?;
    debug!(uri = %uri, "Record deleted");
    Ok(())
}

/// Send `writes` as concurrent `applyWrites` batches of at most `chunk_size`.
///
/// Fails with [`ClientError::PartialWrite`] if any batch failed; the other
/// batches may still have been applied.
pub async fn apply_writes<T: Transport>(
    transport: &T,
    repo: &Did,
    writes: Vec<WriteOp>,
    chunk_size: usize,
) -> Result<()> {
    if writes.is_empty() {
        return Ok(());
    }

    let mut batches = Vec::new();
    for chunk in writes.chunks(chunk_size.max(1)) {
        let data = json!({ "repo": repo, "writes": serde_json::to_value(chunk)? });
        batches.push(transport.call(APPLY_WRITES, data));
    }
    let total = batches.len();

    let results = join_all(batches).await;
    let failed = results.iter().filter(|r| r.is_err()).count();

    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        warn!(error = %err, "applyWrites batch failed");
    }

    if failed > 0 {
        return Err(ClientError::PartialWrite { failed, total });
    }

    debug!(writes = writes.len(), batches = total, "Writes applied");
    Ok(())
}
