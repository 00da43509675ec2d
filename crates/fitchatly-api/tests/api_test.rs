/// Integration test: drive the full REST surface end to end against an
/// in-memory database and a local OpenAI-compatible provider stub.
///
/// Requests go through the real router (auth middleware included) via
/// `tower::ServiceExt::oneshot`; only the completion provider is stubbed,
/// served over loopback so the adapter speaks real HTTP.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

use fitchatly_api::{AppState, AppStateInner};
use fitchatly_assistant::{CompletionAdapter, MemoryTranscripts, ProviderConfig};
use fitchatly_db::Database;
use fitchatly_types::assistant::ASSISTANT_USER_ID;
use fitchatly_types::channel::private_channel_id;

#[derive(Clone, Copy)]
enum ProviderMode {
    SyncText(&'static str),
    SyncBlank,
    Failure(u16, &'static str),
    Stream(&'static [&'static str]),
}

async fn completions(
    axum::extract::State(mode): axum::extract::State<ProviderMode>,
) -> axum::response::Response {
    match mode {
        ProviderMode::SyncText(text) => axum::Json(json!({
            "choices": [{"message": {"role": "assistant", "content": text}}]
        }))
        .into_response(),
        ProviderMode::SyncBlank => axum::Json(json!({
            "choices": [{"message": {"role": "assistant", "content": "   "}}]
        }))
        .into_response(),
        ProviderMode::Failure(status, detail) => {
            (StatusCode::from_u16(status).unwrap(), detail.to_string()).into_response()
        }
        ProviderMode::Stream(chunks) => {
            let mut sse = String::new();
            for chunk in chunks {
                let frame = json!({"choices": [{"delta": {"content": chunk}}]});
                sse.push_str(&format!("data: {frame}\n\n"));
            }
            sse.push_str("data: [DONE]\n\n");
            ([("content-type", "text/event-stream")], sse).into_response()
        }
    }
}

async fn spawn_provider(mode: ProviderMode) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", axum::routing::post(completions))
        .with_state(mode);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/v1")
}

async fn test_app(mode: ProviderMode) -> (Router, AppState) {
    let base_url = spawn_provider(mode).await;
    let db = Database::open_in_memory().unwrap();
    let adapter = CompletionAdapter::new(
        ProviderConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            model: "gpt-3.5-turbo".to_string(),
        },
        Arc::new(MemoryTranscripts::new()),
    );
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret".to_string(),
        adapter,
    });

    (fitchatly_api::router(state.clone()), state)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Registers a user and returns (user id, bearer token).
async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(&json!({
                "email": format!("{username}@example.com"),
                "username": username,
                "password": "password123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        body["user"]["id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn register_returns_user_without_password_and_a_token() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(&json!({
                "email": "jamie@example.com",
                "username": "jamie",
                "password": "password123",
                "name": "Jamie",
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "jamie");
    assert_eq!(body["user"]["name"], "Jamie");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password").is_none());
    assert!(!body["token"].as_str().unwrap().is_empty());

    // Blank required fields fail validation.
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(&json!({"email": "x@example.com", "username": "", "password": "pw"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("required"));

    // Duplicate email or username conflicts.
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/auth/register",
            None,
            Some(&json!({
                "email": "jamie@example.com",
                "username": "other",
                "password": "password123",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email or username already exists");
}

#[tokio::test]
async fn login_accepts_email_or_username() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (user_id, _token) = register(&app, "jamie").await;

    for login in ["jamie@example.com", "jamie"] {
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/auth/login",
                None,
                Some(&json!({"login": login, "password": "password123"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], user_id.as_str());
        assert_eq!(body["username"], "jamie");
        assert!(!body["token"].as_str().unwrap().is_empty());
    }

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(&json!({"login": "jamie", "password": "wrong-password"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/auth/login",
            None,
            Some(&json!({"login": "nobody", "password": "password123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;

    let (status, body) = send(&app, request("GET", "/auth/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, request("GET", "/channels", Some("not-a-jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, token) = register(&app, "jamie").await;
    let (status, body) = send(&app, request("GET", "/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "jamie");
}

#[tokio::test]
async fn submit_message_persists_trimmed_content() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (user_id, token) = register(&app, "jamie").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/messages",
            Some(&token),
            Some(&json!({"channelId": "c1", "content": "  hello world  "})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "hello world");
    assert_eq!(body["channelId"], "c1");
    assert_eq!(body["userId"], user_id.as_str());
    assert_eq!(body["user"]["name"], "jamie");

    let (status, body) = send(&app, request("GET", "/messages/c1", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["content"], "hello world");
}

#[tokio::test]
async fn blank_content_is_rejected_without_a_row() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (_, token) = register(&app, "jamie").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/messages",
            Some(&token),
            Some(&json!({"channelId": "c1", "content": "   "})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, body) = send(&app, request("GET", "/messages/c1", Some(&token), None)).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_public_channel_is_a_server_error() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (_, token) = register(&app, "jamie").await;

    // Only private identifiers materialize on demand.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/messages",
            Some(&token),
            Some(&json!({"channelId": "c999", "content": "hello"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn private_channel_materializes_and_stays_private() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (u1, token1) = register(&app, "u1").await;
    let (_u2, token2) = register(&app, "u2").await;

    let channel = private_channel_id(&u1, "strength");
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/messages",
            Some(&token1),
            Some(&json!({"channelId": channel, "content": "first"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Owner sees the new channel alongside the seeded public set.
    let (_, body) = send(&app, request("GET", "/channels", Some(&token1), None)).await;
    let channels = body.as_array().unwrap();
    assert_eq!(channels.len(), 8);
    assert!(channels
        .iter()
        .any(|c| c["id"] == channel.as_str() && c["kind"] == "private"));

    // Another user sees neither the listing entry nor the channel itself.
    let (_, body) = send(&app, request("GET", "/channels", Some(&token2), None)).await;
    assert!(!body
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["id"] == channel.as_str()));

    let uri = format!("/channels/{channel}");
    let (status, _) = send(&app, request("GET", &uri, Some(&token2), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, request("GET", &uri, Some(&token1), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "private");
}

#[tokio::test]
async fn fetch_caps_at_window_in_chronological_order() {
    let (app, state) = test_app(ProviderMode::SyncText("unused")).await;
    let (user_id, token) = register(&app, "jamie").await;

    for i in 0..55 {
        state
            .db
            .insert_message(
                &Uuid::new_v4().to_string(),
                "c1",
                &user_id,
                &format!("message {i}"),
                &format!("2026-01-01T00:00:{:02}.{:03}+00:00", i / 10, i % 10),
            )
            .unwrap();
    }

    let (status, body) = send(&app, request("GET", "/messages/c1", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 50);
    assert_eq!(rows[0]["content"], "message 5");
    assert_eq!(rows[49]["content"], "message 54");

    let times: Vec<chrono::DateTime<chrono::Utc>> = rows
        .iter()
        .map(|m| m["createdAt"].as_str().unwrap().parse().unwrap())
        .collect();
    for pair in times.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[tokio::test]
async fn private_fetch_excludes_third_parties() {
    let (app, state) = test_app(ProviderMode::SyncText("unused")).await;
    let (u1, token1) = register(&app, "u1").await;
    let (u2, _token2) = register(&app, "u2").await;

    let channel = private_channel_id(&u1, "strength");
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/messages",
            Some(&token1),
            Some(&json!({"channelId": channel, "content": "mine"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Rows slipped in past the API by another user and by the assistant.
    state
        .db
        .insert_message(
            &Uuid::new_v4().to_string(),
            &channel,
            &u2,
            "intruder",
            "2026-01-01T00:00:00.000+00:00",
        )
        .unwrap();
    state
        .db
        .insert_message(
            &Uuid::new_v4().to_string(),
            &channel,
            ASSISTANT_USER_ID,
            "assistant reply",
            "2026-01-01T00:00:01.000+00:00",
        )
        .unwrap();

    let uri = format!("/messages/{channel}");
    let (_, body) = send(&app, request("GET", &uri, Some(&token1), None)).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|m| m["userId"] != u2.as_str()));
    assert!(rows.iter().any(|m| m["content"] == "mine"));
    assert!(rows.iter().any(|m| m["content"] == "assistant reply"));
}

#[tokio::test]
async fn exchange_success_creates_exactly_two_rows() {
    let reply_text = "Warm up with five minutes of easy rowing, then dynamic stretches.";
    let (app, _state) = test_app(ProviderMode::SyncText(reply_text)).await;
    let (u1, token) = register(&app, "u1").await;
    let channel = private_channel_id(&u1, "strength");

    // Step A
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/messages",
            Some(&token),
            Some(&json!({"channelId": channel, "content": "What's a good warmup?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content"], "What's a good warmup?");
    assert_eq!(body["channelId"], channel.as_str());
    assert_eq!(body["userId"], u1.as_str());

    // Step B
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/assistant/reply",
            Some(&token),
            Some(&json!({"channelId": channel, "content": "What's a good warmup?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["userId"], ASSISTANT_USER_ID);
    assert_eq!(body["content"], reply_text);
    assert_eq!(body["user"]["name"], "AI Fitness Assistant");

    let uri = format!("/messages/{channel}");
    let (_, body) = send(&app, request("GET", &uri, Some(&token), None)).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["userId"], u1.as_str());
    assert_eq!(rows[1]["userId"], ASSISTANT_USER_ID);
}

#[tokio::test]
async fn failed_completion_leaves_exactly_one_row() {
    let (app, _state) = test_app(ProviderMode::Failure(500, "provider exploded")).await;
    let (u1, token) = register(&app, "u1").await;
    let channel = private_channel_id(&u1, "strength");

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/messages",
            Some(&token),
            Some(&json!({"channelId": channel, "content": "What's a good warmup?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/assistant/reply",
            Some(&token),
            Some(&json!({"channelId": channel, "content": "What's a good warmup?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("500"));

    let uri = format!("/messages/{channel}");
    let (_, body) = send(&app, request("GET", &uri, Some(&token), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_completion_is_a_server_error() {
    let (app, _state) = test_app(ProviderMode::SyncBlank).await;
    let (u1, token) = register(&app, "u1").await;
    let channel = private_channel_id(&u1, "nutrition");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/assistant/reply",
            Some(&token),
            Some(&json!({"channelId": channel, "content": "hello"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "AI did not generate a response.");
}

#[tokio::test]
async fn assistant_reply_rejects_public_channels() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (_, token) = register(&app, "u1").await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/assistant/reply",
            Some(&token),
            Some(&json!({"channelId": "c1", "content": "hello"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("channel ID pattern"));
}

#[tokio::test]
async fn chat_stream_emits_named_frames_in_order() {
    let chunks: &[&str] = &["Stay", " hydrated."];
    let (app, state) = test_app(ProviderMode::Stream(chunks)).await;
    let (u1, token) = register(&app, "u1").await;
    let channel = private_channel_id(&u1, "cardio");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/chat/{channel}"),
            Some(&token),
            Some(&json!({"messages": [{"role": "user", "content": "Any tips?"}]})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(body.contains("event: open"));
    assert!(body.contains("Connection established"));
    assert!(body.contains("event: userMessage"));
    assert!(body.contains("Any tips?"));
    assert_eq!(body.matches("event: chunk").count(), 2);
    assert!(body.contains("event: done"));
    assert!(body.contains("Stay hydrated."));
    assert!(!body.contains("event: error"));
    // Frames arrive in protocol order.
    let open_at = body.find("event: open").unwrap();
    let user_at = body.find("event: userMessage").unwrap();
    let chunk_at = body.find("event: chunk").unwrap();
    let done_at = body.find("event: done").unwrap();
    assert!(open_at < user_at && user_at < chunk_at && chunk_at < done_at);

    // Transcript carries the exchange for the next contextual request.
    let transcript = state.adapter.transcripts().list(&channel);
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, "user");
    assert_eq!(transcript[0].content, "Any tips?");
    assert_eq!(transcript[1].role, "assistant");
    assert_eq!(transcript[1].content, "Stay hydrated.");
}

#[tokio::test]
async fn zero_chunk_stream_falls_back_to_explanatory_text() {
    let (app, _state) = test_app(ProviderMode::Stream(&[])).await;
    let (u1, token) = register(&app, "u1").await;
    let channel = private_channel_id(&u1, "cardio");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/chat/{channel}"),
            Some(&token),
            Some(&json!({"messages": [{"role": "user", "content": "Any tips?"}]})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert_eq!(body.matches("event: chunk").count(), 0);
    assert!(body.contains("event: done"));
    assert!(body.contains("I'm having trouble connecting"));
    assert!(!body.contains("event: error"));
}

#[tokio::test]
async fn favorites_roundtrip() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (_, token) = register(&app, "jamie").await;

    let (status, first) = send(
        &app,
        request("POST", "/favorites/c1", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["channelId"], "c1");

    // Idempotent re-add returns the same row.
    let (status, again) = send(
        &app,
        request("POST", "/favorites/c1", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(again["id"], first["id"]);

    let (_, body) = send(&app, request("GET", "/favorites", Some(&token), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        request("DELETE", "/favorites/c1", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], true);

    let (_, body) = send(
        &app,
        request("DELETE", "/favorites/c1", Some(&token), None),
    )
    .await;
    assert_eq!(body["removed"], false);

    let (status, _) = send(
        &app,
        request("POST", "/favorites/no-such-channel", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn profile_updates_keep_unset_fields() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (_, token) = register(&app, "jamie").await;

    let (status, body) = send(
        &app,
        request("PUT", "/profile", Some(&token), Some(&json!({"name": "Coach K"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Coach K");

    let (_, body) = send(
        &app,
        request(
            "PUT",
            "/profile",
            Some(&token),
            Some(&json!({"image": "https://cdn.example/k.png"})),
        ),
    )
    .await;
    assert_eq!(body["name"], "Coach K");
    assert_eq!(body["image"], "https://cdn.example/k.png");

    let (_, body) = send(&app, request("GET", "/auth/me", Some(&token), None)).await;
    assert_eq!(body["name"], "Coach K");
    assert_eq!(body["image"], "https://cdn.example/k.png");
}

#[tokio::test]
async fn channel_listing_starts_with_the_seeded_public_set() {
    let (app, _state) = test_app(ProviderMode::SyncText("unused")).await;
    let (_, token) = register(&app, "jamie").await;

    let (status, body) = send(&app, request("GET", "/channels", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let channels = body.as_array().unwrap();
    assert_eq!(channels.len(), 7);
    assert!(channels.iter().all(|c| c["kind"] == "public"));
    for name in ["general", "help", "random", "running", "weighttraining", "rockclimbing", "calisthenics"] {
        assert!(channels.iter().any(|c| c["name"] == name), "missing {name}");
    }
}
