use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use plume_cache::SignalizedList;
use plume_shared::constants::COLLECTION_LIST_ITEM;
use plume_shared::{AtUri, Did};

use super::{array, cursor, field, unexpected, with_page};
use crate::error::Result;
use crate::models::{InfiniteData, ListMember, ListMembersPage, ListMembership, ProfileListsPage, QueryData};
use crate::query::QueryKey;
use crate::state::ClientState;
use crate::transport::{Transport, GET_LIST, GET_LISTS, LIST_RECORDS};

/// The list itself, without its members.
pub async fn get_list_info<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    uri: &AtUri,
) -> Result<Rc<SignalizedList>> {
    let key = QueryKey::list_info(session, uri);
    let data = state
        .queries
        .fetch_query(&key, || fetch_list_info(state, session, uri))
        .await?;

    match data {
        QueryData::List(list) => Ok(list),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_list_info<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    uri: &AtUri,
) -> Result<QueryData> {
    let body = state.transport.get(GET_LIST, json!({ "list": uri, "limit": 1 })).await?;
    let tag = state.cache.next_version_tag();
    let list = state
        .cache
        .merge_list_value(session, field(&body, "list")?.clone(), Some(tag))?;
    Ok(QueryData::List(list))
}

/// One page of a list's members, with the list itself.
pub async fn get_list_members<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    uri: &AtUri,
    page_param: Option<String>,
) -> Result<Rc<InfiniteData<ListMembersPage>>> {
    let key = QueryKey::list_members(session, uri, state.config.page_limit);
    let data = state
        .queries
        .fetch_query(&key, || fetch_list_members(state, &key, session, uri, page_param))
        .await?;

    match data {
        QueryData::ListMembers(members) => Ok(members),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_list_members<T: Transport>(
    state: &ClientState<T>,
    key: &QueryKey,
    session: &Did,
    uri: &AtUri,
    page_param: Option<String>,
) -> Result<QueryData> {
    let body = state
        .transport
        .get(
            GET_LIST,
            json!({ "list": uri, "limit": state.config.page_limit, "cursor": page_param }),
        )
        .await?;

    let tag = state.cache.next_version_tag();
    let list = state
        .cache
        .merge_list_value(session, field(&body, "list")?.clone(), Some(tag))?;

    let mut members = Vec::new();
    for item in array(&body, "items")? {
        let item_uri: AtUri = serde_json::from_value(field(item, "uri")?.clone())?;
        let profile = state
            .cache
            .merge_profile_value(session, field(item, "subject")?.clone(), Some(tag))?;
        members.push(ListMember {
            uri: item_uri,
            profile,
        });
    }

    let page = ListMembersPage {
        cursor: cursor(&body),
        list,
        members,
    };
    let existing = match state.queries.get_query_data(key) {
        Some(QueryData::ListMembers(data)) => Some(data),
        _ => None,
    };
    Ok(QueryData::ListMembers(with_page(existing, page_param, page)?))
}

/// One page of the lists created by `actor`.
pub async fn get_profile_lists<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    actor: &str,
    page_param: Option<String>,
) -> Result<Rc<InfiniteData<ProfileListsPage>>> {
    let key = QueryKey::profile_lists(session, actor);
    let data = state
        .queries
        .fetch_query(&key, || fetch_profile_lists(state, &key, session, actor, page_param))
        .await?;

    match data {
        QueryData::ProfileLists(lists) => Ok(lists),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_profile_lists<T: Transport>(
    state: &ClientState<T>,
    key: &QueryKey,
    session: &Did,
    actor: &str,
    page_param: Option<String>,
) -> Result<QueryData> {
    let body = state
        .transport
        .get(
            GET_LISTS,
            json!({ "actor": actor, "limit": state.config.page_limit, "cursor": page_param }),
        )
        .await?;

    let tag = state.cache.next_version_tag();
    let lists = array(&body, "lists")?
        .iter()
        .map(|view| state.cache.merge_list_value(session, view.clone(), Some(tag)))
        .collect::<plume_cache::Result<Vec<Rc<SignalizedList>>>>()?;

    let page = ProfileListsPage {
        cursor: cursor(&body),
        lists,
    };
    let existing = match state.queries.get_query_data(key) {
        Some(QueryData::ProfileLists(data)) => Some(data),
        _ => None,
    };
    Ok(QueryData::ProfileLists(with_page(existing, page_param, page)?))
}

#[derive(Deserialize)]
struct ListItemRecord {
    list: AtUri,
    subject: Did,
}

#[derive(Deserialize)]
struct RecordEntry {
    uri: AtUri,
    value: ListItemRecord,
}

/// Every list item record in the session's repo.
pub async fn get_list_memberships<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
) -> Result<Rc<Vec<ListMembership>>> {
    let key = QueryKey::list_memberships(session);
    let data = state
        .queries
        .fetch_query(&key, || fetch_list_memberships(state, session))
        .await?;

    match data {
        QueryData::ListMemberships(memberships) => Ok(memberships),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_list_memberships<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
) -> Result<QueryData> {
    let mut memberships = Vec::new();
    let mut page_cursor: Option<String> = None;

    loop {
        let body = state
            .transport
            .get(
                LIST_RECORDS,
                json!({
                    "repo": session,
                    "collection": COLLECTION_LIST_ITEM,
                    "limit": 100,
                    "cursor": page_cursor,
                }),
            )
            .await?;

        let records = array(&body, "records")?;
        for record in records {
            let entry: RecordEntry = serde_json::from_value(record.clone())?;
            memberships.push(ListMembership {
                actor: entry.value.subject,
                list_uri: entry.value.list,
                item_uri: entry.uri,
            });
        }

        page_cursor = cursor(&body);
        if page_cursor.is_none() || records.is_empty() {
            break;
        }
    }

    debug!(session = %session, count = memberships.len(), "Loaded list memberships");
    Ok(QueryData::ListMemberships(Rc::new(memberships)))
}
