use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

use fitchatly_assistant::{Reply, ReplyOptions};
use fitchatly_types::api::{AssistantReplyRequest, ChatTurn, MessageAuthor, MessageResponse};
use fitchatly_types::assistant::{ASSISTANT_NAME, ASSISTANT_USER_ID, SYSTEM_INSTRUCTION};
use fitchatly_types::channel::is_private_channel;

use crate::auth::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::Claims;

/// Step B of the exchange: one stateless completion for the just-sent user
/// message, persisted under the assistant identity. A failed or empty
/// completion fails the request and persists nothing.
pub async fn assistant_reply(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<AssistantReplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() || req.channel_id.is_empty() {
        return Err(ApiError::validation(
            "Message content and channel ID are required",
        ));
    }
    if !is_private_channel(&req.channel_id) {
        return Err(ApiError::validation(
            "Invalid channel ID pattern for an assistant reply",
        ));
    }

    let reply = state
        .adapter
        .reply(
            &req.channel_id,
            Some(SYSTEM_INSTRUCTION),
            vec![ChatTurn::user(content)],
            ReplyOptions::stateless_sync(),
        )
        .await?;

    let Reply::Full(text) = reply else {
        return Err(ApiError::internal("Unexpected reply delivery mode"));
    };

    let message_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let created_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let db = state.clone();
    let (mid, cid, body) = (message_id.clone(), req.channel_id.clone(), text.clone());
    tokio::task::spawn_blocking(move || {
        db.db
            .insert_message(&mid, &cid, ASSISTANT_USER_ID, &body, &created_at)
    })
    .await
    .map_err(join_error)??;

    info!(channel = %req.channel_id, "Assistant reply persisted");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            content: text,
            channel_id: req.channel_id,
            user_id: ASSISTANT_USER_ID.to_string(),
            created_at: now,
            user: MessageAuthor {
                id: ASSISTANT_USER_ID.to_string(),
                name: Some(ASSISTANT_NAME.to_string()),
                image: None,
            },
        }),
    ))
}
