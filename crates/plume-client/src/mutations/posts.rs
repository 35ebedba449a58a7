use std::rc::Rc;

use tracing::{info, warn};

use plume_cache::SignalizedPost;
use plume_shared::Did;

use crate::error::Result;
use crate::queries::refetch;
use crate::state::ClientState;
use crate::transport::{delete_record, Transport};
use crate::updaters::Effect;

/// Delete `post` and drop it from every cached result showing it.
pub async fn delete_post<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    post: &Rc<SignalizedPost>,
) -> Result<()> {
    delete_record(&state.transport, session, &post.uri).await?;

    let effect = Effect::PostDeleted {
        session: session.clone(),
        uri: post.uri.clone(),
        author_handle: Some(post.author.handle.get()),
        parent: post.parent_uri(),
    };
    let dependents = state.apply_effect(&effect);
    info!(uri = %post.uri, "Post deleted");

    for key in dependents {
        if let Err(e) = refetch(state, &key).await {
            warn!(key = %key, error = %e, "Refetch after delete failed");
        }
    }
    Ok(())
}
