use axum::{Extension, Json, extract::State, response::IntoResponse};

use fitchatly_types::api::UpdateProfileRequest;

use crate::auth::{AppState, user_response};
use crate::error::{ApiError, join_error};
use crate::middleware::Claims;

/// Update the caller's display fields. Omitted or blank fields keep their
/// stored values.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let image = req
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let db = state.clone();
    let uid = claims.sub.clone();
    let user = tokio::task::spawn_blocking(move || {
        db.db.update_profile(&uid, name.as_deref(), image.as_deref())
    })
    .await
    .map_err(join_error)??
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user_response(user)))
}
