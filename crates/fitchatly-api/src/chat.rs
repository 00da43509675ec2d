use std::convert::Infallible;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::Stream;
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use fitchatly_assistant::{FALLBACK_REPLY, Reply, ReplyOptions, StreamEvent};
use fitchatly_types::api::{ChatStreamRequest, ChatTurn};
use fitchatly_types::events::{
    EVENT_CHUNK, EVENT_DONE, EVENT_ERROR, EVENT_OPEN, EVENT_USER_MESSAGE, StreamChunk,
    StreamError, StreamMessageFrame, StreamOpen,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;

/// The incremental reply flow: the provider's answer is forwarded fragment
/// by fragment as named SSE frames. Provider configuration problems fail
/// the request before the stream opens; failures after that arrive as an
/// `error` frame.
pub async fn chat_stream(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<ChatStreamRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // The last user-role turn is echoed back and recorded; the rest of the
    // request turns only provide context.
    let user_turn = req
        .messages
        .last()
        .filter(|turn| turn.role == "user")
        .cloned();

    if let Some(turn) = &user_turn {
        state.adapter.transcripts().append(&channel_id, turn.clone());
    }

    let reply = state
        .adapter
        .reply(
            &channel_id,
            None,
            req.messages,
            ReplyOptions::contextual_incremental(),
        )
        .await?;

    let Reply::Incremental(mut rx) = reply else {
        return Err(ApiError::internal("Unexpected reply delivery mode"));
    };

    info!(channel = %channel_id, "Chat stream opened");

    let stream = async_stream::stream! {
        yield Ok(frame(EVENT_OPEN, &StreamOpen {
            message: "Connection established".to_string(),
        }));

        if let Some(turn) = user_turn {
            yield Ok(frame(EVENT_USER_MESSAGE, &StreamMessageFrame {
                id: Uuid::new_v4().to_string(),
                content: turn.content,
                role: turn.role,
            }));
        }

        let mut collected = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Chunk(content) => {
                    collected.push_str(&content);
                    yield Ok(frame(EVENT_CHUNK, &StreamChunk {
                        content,
                        role: "assistant".to_string(),
                    }));
                }
                StreamEvent::Error(details) => {
                    yield Ok(frame(EVENT_ERROR, &StreamError {
                        message: "Error generating response".to_string(),
                        details,
                    }));
                    return;
                }
                StreamEvent::End => break,
            }
        }

        if collected.is_empty() {
            // Never close with an empty final message.
            collected = FALLBACK_REPLY.to_string();
        } else {
            state
                .adapter
                .transcripts()
                .append(&channel_id, ChatTurn::assistant(collected.clone()));
        }

        yield Ok(frame(EVENT_DONE, &StreamMessageFrame {
            id: Uuid::new_v4().to_string(),
            content: collected,
            role: "assistant".to_string(),
        }));
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn frame(name: &'static str, payload: &impl Serialize) -> Event {
    match serde_json::to_string(payload) {
        Ok(json) => Event::default().event(name).data(json),
        Err(e) => {
            error!("Failed to serialize {name} frame: {e}");
            Event::default().event(EVENT_ERROR).data(
                r#"{"message":"Error generating response","details":"serialization failure"}"#,
            )
        }
    }
}
