pub mod assistant;
pub mod auth;
pub mod channels;
pub mod chat;
pub mod error;
pub mod favorites;
pub mod messages;
pub mod middleware;
pub mod profile;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

pub use crate::auth::{AppState, AppStateInner};
pub use crate::error::ApiError;

use crate::middleware::require_auth;

/// The full REST surface over one shared state. Everything except
/// registration and login sits behind the bearer-token middleware.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/profile", put(profile::update_profile))
        .route("/channels", get(channels::list_channels))
        .route("/channels/{channel_id}", get(channels::get_channel))
        .route("/messages", post(messages::submit_message))
        .route("/messages/{channel_id}", get(messages::get_messages))
        .route("/assistant/reply", post(assistant::assistant_reply))
        .route("/chat/{channel_id}", post(chat::chat_stream))
        .route("/favorites", get(favorites::list_favorites))
        .route("/favorites/{channel_id}", post(favorites::add_favorite))
        .route("/favorites/{channel_id}", delete(favorites::remove_favorite))
        .layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
