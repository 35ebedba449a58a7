//! Query functions: fetch through the transport, merge the response into
//! the entity cache under one version tag, store the result by key.
//!
//! Merging happens inside the fetch future, after the response resolved, so
//! a cancelled fetch never touches the entity cache.

mod conversations;
mod lists;
mod posts;
mod profiles;
mod timeline;

use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use plume_shared::{AtUri, Did};

use crate::error::{ClientError, Result};
use crate::models::{InfiniteData, QueryData};
use crate::query::{QueryFilter, QueryKey, GET_CONVO, GET_LIST_INFO, GET_POST};
use crate::state::ClientState;
use crate::transport::Transport;

pub use conversations::{get_convo, list_conversations};
pub use lists::{get_list_info, get_list_members, get_list_memberships, get_profile_lists};
pub use posts::{get_post, get_post_thread};
pub use profiles::{get_initial_profile_follows, get_profile, get_profile_follows};
pub use timeline::get_timeline;

/// Fetch a dependent query again. Keys without a dedicated refetch are
/// marked stale instead.
pub async fn refetch<T: Transport>(state: &ClientState<T>, key: &QueryKey) -> Result<()> {
    match (key.name(), key.part(1), key.part(2)) {
        (GET_POST, Some(session), Some(uri)) => {
            let session = Did::parse(session)?;
            get_post(state, &session, &AtUri::parse(uri)?).await?;
        }
        (GET_LIST_INFO, Some(session), Some(uri)) => {
            let session = Did::parse(session)?;
            get_list_info(state, &session, &AtUri::parse(uri)?).await?;
        }
        (GET_CONVO, Some(session), Some(id)) => {
            get_convo(state, &Did::parse(session)?, id).await?;
        }
        _ => {
            debug!(key = %key, "No refetch for query, invalidating");
            state.queries.invalidate_queries(&QueryFilter::exact(key.clone()));
        }
    }
    Ok(())
}

pub(crate) fn unexpected(data: &QueryData) -> ClientError {
    ClientError::MissingData(format!("unexpected {} data in query cache", data.variant_name()))
}

pub(crate) fn field<'a>(body: &'a Value, name: &str) -> Result<&'a Value> {
    body.get(name)
        .ok_or_else(|| ClientError::MissingData(format!("response has no `{name}`")))
}

pub(crate) fn array<'a>(body: &'a Value, name: &str) -> Result<&'a Vec<Value>> {
    field(body, name)?
        .as_array()
        .ok_or_else(|| ClientError::MissingData(format!("`{name}` is not an array")))
}

pub(crate) fn cursor(body: &Value) -> Option<String> {
    body.get("cursor").and_then(Value::as_str).map(str::to_string)
}

/// The first page when `param` is `None`, otherwise `existing` with `page`
/// appended. A follow-up page with no cached first page is dropped: its
/// cursor belongs to pages that are gone.
pub(crate) fn with_page<P: Clone>(
    existing: Option<Rc<InfiniteData<P>>>,
    param: Option<String>,
    page: P,
) -> Result<Rc<InfiniteData<P>>> {
    match (existing, param) {
        (_, None) => Ok(Rc::new(InfiniteData::first(page))),
        (Some(data), Some(param)) => {
            let mut next = (*data).clone();
            next.push(Some(param), page);
            Ok(Rc::new(next))
        }
        (None, Some(param)) => {
            debug!(cursor = %param, "Dropping page fetched after its query was reset");
            Err(ClientError::MissingData(format!(
                "no cached first page for cursor `{param}`"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_page() {
        let first = with_page(None, None, 1).unwrap();
        assert_eq!(first.pages, [1]);

        let second = with_page(Some(Rc::clone(&first)), Some("c1".into()), 2).unwrap();
        assert_eq!(second.pages, [1, 2]);
        assert_eq!(second.page_params, [None, Some("c1".to_string())]);

        // Starting over drops the old pages.
        let restarted = with_page(Some(second), None, 3).unwrap();
        assert_eq!(restarted.pages, [3]);
    }

    #[test]
    fn test_with_page_without_first_page_is_dropped() {
        let err = with_page(None, Some("c1".into()), 2).unwrap_err();
        assert!(matches!(err, ClientError::MissingData(_)));
    }
}
