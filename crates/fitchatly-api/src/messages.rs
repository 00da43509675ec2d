use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use fitchatly_db::models::{MessageRow, UserRow};
use fitchatly_types::api::{MessageAuthor, MessageResponse, SubmitMessageRequest};
use fitchatly_types::assistant::ASSISTANT_USER_ID;
use fitchatly_types::channel::is_private_channel;

use crate::auth::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::Claims;

/// Channel history window: fetches return at most this many rows.
pub const MESSAGE_WINDOW: u32 = 50;

/// Step A of the exchange: persist the caller's message. Private channels
/// materialize on first use; public channels must already exist.
pub async fn submit_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() || req.channel_id.is_empty() {
        return Err(ApiError::validation("Content and channel ID are required"));
    }
    let channel_id = req.channel_id;

    let message_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let created_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let (mid, cid, uid, body) = (
        message_id.clone(),
        channel_id.clone(),
        claims.sub.clone(),
        content.clone(),
    );
    let author = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<UserRow>> {
        let Some(user) = db.db.get_user_by_id(&uid)? else {
            return Ok(None);
        };
        if is_private_channel(&cid) {
            db.db.create_channel_if_absent(&cid, &cid, "private")?;
        }
        db.db.insert_message(&mid, &cid, &uid, &body, &created_at)?;
        Ok(Some(user))
    })
    .await
    .map_err(join_error)??
    .ok_or_else(|| ApiError::unauthorized("Unknown user"))?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            content,
            channel_id,
            user_id: claims.sub,
            created_at: now,
            user: MessageAuthor {
                id: author.id,
                name: author.name,
                image: author.image,
            },
        }),
    ))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.clone();

    let rows = tokio::task::spawn_blocking(move || {
        // A private channel shows only the requester's exchange with the
        // assistant, regardless of what else was written there.
        if is_private_channel(&channel_id) {
            db.db
                .recent_messages(&channel_id, MESSAGE_WINDOW, Some((&uid, ASSISTANT_USER_ID)))
        } else {
            db.db.recent_messages(&channel_id, MESSAGE_WINDOW, None)
        }
    })
    .await
    .map_err(join_error)??;

    let messages: Vec<MessageResponse> = rows.into_iter().map(message_response).collect();
    Ok(Json(messages))
}

pub(crate) fn message_response(row: MessageRow) -> MessageResponse {
    let created_at = row
        .created_at
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite column defaults store "YYYY-MM-DD HH:MM:SS" without a
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(&row.created_at, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!(
                "Corrupt created_at '{}' on message '{}': {}",
                row.created_at, row.id, e
            );
            DateTime::default()
        });

    MessageResponse {
        id: row.id,
        content: row.content,
        channel_id: row.channel_id,
        user_id: row.author_id.clone(),
        created_at,
        user: MessageAuthor {
            id: row.author_id,
            name: row.author_name,
            image: row.author_image,
        },
    }
}
