use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use fitchatly_db::models::ChannelRow;
use fitchatly_types::api::ChannelResponse;
use fitchatly_types::channel::{is_private_channel, private_channel_id};

use crate::auth::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::Claims;

/// The public set plus the caller's own materialized private channels.
pub async fn list_channels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_channels_for(&uid))
        .await
        .map_err(join_error)??;

    let channels: Vec<ChannelResponse> = rows.into_iter().map(channel_response).collect();
    Ok(Json(channels))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    // A private channel is visible to its addressee only; everyone else gets
    // the same answer as for a channel that does not exist.
    if is_private_channel(&channel_id)
        && !channel_id.starts_with(&private_channel_id(&claims.sub, ""))
    {
        return Err(ApiError::not_found("Channel not found"));
    }

    let db = state.clone();
    let cid = channel_id.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_channel(&cid))
        .await
        .map_err(join_error)??
        .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    Ok(Json(channel_response(row)))
}

fn channel_response(row: ChannelRow) -> ChannelResponse {
    ChannelResponse {
        id: row.id,
        name: row.name,
        kind: row.kind,
    }
}
