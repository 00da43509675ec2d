use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use fitchatly_assistant::CompletionAdapter;
use fitchatly_db::Database;
use fitchatly_db::models::UserRow;
use fitchatly_types::api::{
    LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserResponse,
};

use crate::error::{ApiError, join_error};
use crate::middleware::Claims;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub adapter: CompletionAdapter,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    let email = req.email.trim().to_string();
    let username = req.username.trim().to_string();
    if email.is_empty() || username.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation(
            "Email, username, and password are required",
        ));
    }

    // Check if the email or username is taken
    let db = state.clone();
    let (email_check, username_check) = (email.clone(), username.clone());
    let taken =
        tokio::task::spawn_blocking(move || db.db.login_taken(&email_check, &username_check))
            .await
            .map_err(join_error)??;
    if taken {
        return Err(ApiError::conflict("Email or username already exists"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| ApiError::internal("Internal server error"))?
        .to_string();

    let user_id = Uuid::new_v4().to_string();
    // Display name falls back to the username when none is given
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&username)
        .to_string();

    let db = state.clone();
    let (uid, em, un, nm) = (
        user_id.clone(),
        email.clone(),
        username.clone(),
        name.clone(),
    );
    tokio::task::spawn_blocking(move || db.db.create_user(&uid, &em, &un, &nm, &password_hash))
        .await
        .map_err(join_error)??;

    info!("User registered: {username}");

    let token = create_token(&state.jwt_secret, &user_id, &username)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: UserResponse {
                id: user_id,
                email: Some(email),
                username: Some(username),
                name: Some(name),
                image: None,
                role: "user".to_string(),
            },
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let login = req.login.trim().to_string();
    if login.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Login and password are required"));
    }

    let db = state.clone();
    let lookup = login.clone();
    let user = tokio::task::spawn_blocking(move || db.db.find_user_by_login(&lookup))
        .await
        .map_err(join_error)??
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    // Rows without a password (the assistant identity, external-auth
    // accounts) never match a password login.
    let stored_hash = user
        .password
        .as_deref()
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    let parsed_hash =
        PasswordHash::new(stored_hash).map_err(|_| ApiError::internal("Internal server error"))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized("Invalid credentials"))?;

    let username = user.username.unwrap_or_default();
    let token = create_token(&state.jwt_secret, &user.id, &username)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        username,
        token,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.clone();
    let user = tokio::task::spawn_blocking(move || db.db.get_user_by_id(&uid))
        .await
        .map_err(join_error)??
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user_response(user)))
}

pub(crate) fn user_response(user: UserRow) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email,
        username: user.username,
        name: user.name,
        image: user.image,
        role: user.role,
    }
}

fn create_token(secret: &str, user_id: &str, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
