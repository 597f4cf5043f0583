use tracing::{error, info};
use uuid::Uuid;

use crate::chat::repo;
use crate::chat::repo_types::MessageRole;
use crate::error::ApiError;
use crate::state::AppState;

/// Forward a prompt to the completion API and persist both sides of the
/// exchange. The user message is stored before the outbound call, so a
/// failure mid-call leaves a visible asked-but-unanswered gap rather than
/// losing the question. Only the current prompt is forwarded; prior turns
/// are not sent as context.
pub async fn relay(state: &AppState, user_id: Uuid, prompt: &str) -> Result<String, ApiError> {
    repo::append(&state.db, user_id, MessageRole::User, prompt).await?;

    let content = match state.llm.complete(prompt).await {
        Ok(c) => c,
        Err(e) => {
            error!(user_id = %user_id, "completion call failed");
            return Err(e);
        }
    };

    repo::append(&state.db, user_id, MessageRole::Assistant, &content).await?;

    info!(user_id = %user_id, "consultation stored");
    Ok(content)
}
