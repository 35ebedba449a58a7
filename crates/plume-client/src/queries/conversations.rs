use std::rc::Rc;

use serde_json::json;

use plume_shared::Did;

use plume_cache::SignalizedConversation;

use super::{array, cursor, field, unexpected, with_page};
use crate::error::Result;
use crate::models::{ConvoListPage, InfiniteData, QueryData};
use crate::query::QueryKey;
use crate::state::ClientState;
use crate::transport::{Transport, GET_CONVO, LIST_CONVOS};

pub async fn list_conversations<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    page_param: Option<String>,
) -> Result<Rc<InfiniteData<ConvoListPage>>> {
    let key = QueryKey::conversations(session);
    let data = state
        .queries
        .fetch_query(&key, || fetch_conversations(state, &key, session, page_param))
        .await?;

    match data {
        QueryData::Conversations(convos) => Ok(convos),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_conversations<T: Transport>(
    state: &ClientState<T>,
    key: &QueryKey,
    session: &Did,
    page_param: Option<String>,
) -> Result<QueryData> {
    let body = state
        .transport
        .get(
            LIST_CONVOS,
            json!({ "limit": state.config.page_limit, "cursor": page_param }),
        )
        .await?;

    let tag = state.cache.next_version_tag();
    let convos = array(&body, "convos")?
        .iter()
        .map(|view| state.cache.merge_conversation_value(session, view.clone(), Some(tag)))
        .collect::<plume_cache::Result<Vec<_>>>()?;

    let page = ConvoListPage {
        cursor: cursor(&body),
        convos,
    };
    let existing = match state.queries.get_query_data(key) {
        Some(QueryData::Conversations(data)) => Some(data),
        _ => None,
    };
    Ok(QueryData::Conversations(with_page(existing, page_param, page)?))
}

pub async fn get_convo<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    id: &str,
) -> Result<Rc<SignalizedConversation>> {
    let key = QueryKey::conversation(session, id);
    let data = state
        .queries
        .fetch_query(&key, || fetch_convo(state, session, id))
        .await?;

    match data {
        QueryData::Conversation(convo) => Ok(convo),
        other => Err(unexpected(&other)),
    }
}

async fn fetch_convo<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    id: &str,
) -> Result<QueryData> {
    let body = state.transport.get(GET_CONVO, json!({ "convoId": id })).await?;
    let tag = state.cache.next_version_tag();
    let convo = state
        .cache
        .merge_conversation_value(session, field(&body, "convo")?.clone(), Some(tag))?;
    Ok(QueryData::Conversation(convo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{convo_json, me, FakeTransport};
    use crate::ClientConfig;

    #[tokio::test]
    async fn test_list_conversations_share_member_profiles() {
        let transport = FakeTransport::new();
        transport.respond(LIST_CONVOS, json!({ "convos": [convo_json("c1"), convo_json("c2")] }));
        let state = ClientState::new(transport, ClientConfig::default());

        let data = list_conversations(&state, &me(), None).await.unwrap();
        let convos = &data.pages[0].convos;
        assert_eq!(convos.len(), 2);

        let a = convos[0].recipients();
        let b = convos[1].recipients();
        assert!(Rc::ptr_eq(&a[0], &b[0]));
        assert_eq!(state.cache.stats().conversations, 2);
    }

    #[tokio::test]
    async fn test_get_convo_shares_instance_with_list() {
        let transport = FakeTransport::new();
        transport.respond(LIST_CONVOS, json!({ "convos": [convo_json("c1")] }));
        transport.respond(GET_CONVO, json!({ "convo": convo_json("c1") }));
        let state = ClientState::new(transport, ClientConfig::default());

        let listed = list_conversations(&state, &me(), None).await.unwrap();
        let convo = get_convo(&state, &me(), "c1").await.unwrap();

        assert!(Rc::ptr_eq(&listed.pages[0].convos[0], &convo));
        assert_eq!(state.transport.calls(GET_CONVO)[0]["convoId"], "c1");
        assert!(state.queries.get_query_data(&QueryKey::conversation(&me(), "c1")).is_some());
    }

    #[tokio::test]
    async fn test_next_page_after_reset_is_dropped() {
        let transport = FakeTransport::new();
        transport.respond(LIST_CONVOS, json!({ "cursor": "c2", "convos": [convo_json("c1")] }));
        let state = ClientState::new(transport, ClientConfig::default());
        let key = QueryKey::conversations(&me());

        list_conversations(&state, &me(), None).await.unwrap();
        state.queries.reset_queries(&crate::QueryFilter::exact(key.clone()));

        let err = list_conversations(&state, &me(), Some("c2".into())).await.unwrap_err();
        assert!(matches!(err, crate::ClientError::MissingData(_)));
        assert!(state.queries.get_query_data(&key).is_none());

        // Starting over still works.
        let data = list_conversations(&state, &me(), None).await.unwrap();
        assert_eq!(data.page_params, [None]);
    }

    #[tokio::test]
    async fn test_shape_mismatch_surfaces() {
        let transport = FakeTransport::new();
        transport.respond(LIST_CONVOS, json!({ "convos": [{"id": "broken"}] }));
        let state = ClientState::new(transport, ClientConfig::default());

        let err = list_conversations(&state, &me(), None).await.unwrap_err();
        assert!(matches!(err, crate::ClientError::Cache(_)));
        assert!(state.queries.get_query_data(&QueryKey::conversations(&me())).is_none());
    }
}
