use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use fitchatly_db::models::FavoriteRow;
use fitchatly_types::api::FavoriteResponse;

use crate::auth::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::Claims;

pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_favorites(&uid))
        .await
        .map_err(join_error)??;

    let favorites: Vec<FavoriteResponse> = rows.into_iter().map(favorite_response).collect();
    Ok(Json(favorites))
}

/// Idempotent: re-favoriting an already-favorited channel returns the
/// existing row.
pub async fn add_favorite(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let favorite_id = Uuid::new_v4().to_string();
    let db = state.clone();
    let uid = claims.sub.clone();
    let cid = channel_id.clone();

    let row = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<FavoriteRow>> {
        if db.db.get_channel(&cid)?.is_none() {
            return Ok(None);
        }
        Ok(Some(db.db.add_favorite(&favorite_id, &uid, &cid)?))
    })
    .await
    .map_err(join_error)??
    .ok_or_else(|| ApiError::not_found("Channel not found"))?;

    Ok((StatusCode::CREATED, Json(favorite_response(row))))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.clone();
    let removed = tokio::task::spawn_blocking(move || db.db.remove_favorite(&uid, &channel_id))
        .await
        .map_err(join_error)??;

    Ok(Json(serde_json::json!({ "removed": removed })))
}

fn favorite_response(row: FavoriteRow) -> FavoriteResponse {
    FavoriteResponse {
        id: row.id,
        user_id: row.user_id,
        channel_id: row.channel_id,
    }
}
