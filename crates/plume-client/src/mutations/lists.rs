use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{info, warn};

use plume_cache::SignalizedProfile;
use plume_shared::{AtUri, Did};

use crate::error::{ClientError, Result};
use crate::models::{ListMembership, QueryData};
use crate::queries::get_list_memberships;
use crate::query::{QueryFilter, QueryKey, GET_LIST_MEMBERS};
use crate::state::ClientState;
use crate::transport::{apply_writes, delete_record, Transport, WriteOp};
use crate::updaters::{Effect, MutationPlan};

/// Cached memberships if fresh, otherwise loaded from the repo.
async fn memberships<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
) -> Result<Rc<Vec<ListMembership>>> {
    let key = QueryKey::list_memberships(session);
    if !state.queries.is_stale(&key) {
        if let Some(QueryData::ListMemberships(memberships)) = state.queries.get_query_data(&key) {
            return Ok(memberships);
        }
    }
    get_list_memberships(state, session).await
}

/// Make `actor` a member of exactly the lists in `lists`: add list items
/// for new lists and delete the ones for lists no longer selected.
pub async fn update_list_memberships<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    actor: &Rc<SignalizedProfile>,
    lists: &BTreeSet<AtUri>,
) -> Result<()> {
    let current = memberships(state, session).await?;
    let previous: Vec<&ListMembership> = current.iter().filter(|m| m.actor == actor.did).collect();

    let removed: Vec<ListMembership> = previous
        .iter()
        .filter(|m| !lists.contains(&m.list_uri))
        .map(|m| (*m).clone())
        .collect();

    let mut writes = Vec::new();
    let mut created = Vec::new();
    for list in lists {
        if previous.iter().any(|m| m.list_uri == *list) {
            continue;
        }
        let (op, item_uri) = WriteOp::create_list_item(session, list, &actor.did);
        writes.push(op);
        created.push(ListMembership {
            actor: actor.did.clone(),
            list_uri: list.clone(),
            item_uri,
        });
    }
    writes.extend(removed.iter().map(|m| WriteOp::delete(&m.item_uri)));

    if writes.is_empty() {
        return Ok(());
    }

    let effect = Effect::MembershipsChanged {
        session: session.clone(),
        actor: Rc::clone(actor),
        created,
        removed,
    };

    match apply_writes(&state.transport, session, writes, state.config.write_chunk_size).await {
        Ok(()) => {
            state.apply_effect(&effect);
            info!(actor = %actor.did, lists = lists.len(), "List memberships updated");
            Ok(())
        }
        Err(e @ ClientError::PartialWrite { .. }) => {
            warn!(actor = %actor.did, error = %e, "List membership update partly failed");
            state.apply_plan(&effect, MutationPlan::memberships_unknown(session, &actor.did));
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Delete the list `uri` along with all of its list items.
pub async fn delete_list<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    uri: &AtUri,
) -> Result<()> {
    let current = memberships(state, session).await?;
    let items: Vec<WriteOp> = current
        .iter()
        .filter(|m| m.list_uri == *uri)
        .map(|m| WriteOp::delete(&m.item_uri))
        .collect();
    let item_count = items.len();

    if let Err(e) = apply_writes(&state.transport, session, items, state.config.write_chunk_size).await {
        warn!(uri = %uri, error = %e, "Deleting list items failed");
        for filter in [
            QueryFilter::exact(QueryKey::list_memberships(session)),
            QueryFilter::prefix(QueryKey::scope(GET_LIST_MEMBERS, session).with(uri)),
            QueryFilter::exact(QueryKey::list_info(session, uri)),
        ] {
            state.queries.invalidate_queries(&filter);
        }
        return Err(e);
    }
    delete_record(&state.transport, session, uri).await?;

    state.apply_effect(&Effect::ListDeleted {
        session: session.clone(),
        uri: uri.clone(),
    });
    info!(uri = %uri, items = item_count, "List deleted");
    Ok(())
}
