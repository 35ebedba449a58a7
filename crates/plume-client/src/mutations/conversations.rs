use serde_json::json;
use tracing::info;

use plume_shared::Did;

use crate::error::Result;
use crate::state::ClientState;
use crate::transport::{Transport, LEAVE_CONVO};
use crate::updaters::Effect;

pub async fn leave_conversation<T: Transport>(
    state: &ClientState<T>,
    session: &Did,
    id: &str,
) -> Result<()> {
    state.transport.call(LEAVE_CONVO, json!({ "convoId": id })).await?;

    state.apply_effect(&Effect::ConversationLeft {
        session: session.clone(),
        id: id.to_string(),
    });
    info!(convo = %id, "Left conversation");
    Ok(())
}
