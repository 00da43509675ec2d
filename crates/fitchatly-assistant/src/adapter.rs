//! The completion-provider adapter.
//!
//! One adapter serves both reply flows with a single configuration surface:
//! context policy (stateless vs. transcript history) and delivery mode
//! (one completed message vs. incrementally forwarded fragments). Request
//! assembly and the wire format are shared; the modes differ only in the
//! `stream` flag, the token budget, and the response shape.

use std::sync::Arc;

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use fitchatly_types::api::ChatTurn;

use crate::error::CompletionError;
use crate::provider::{DeltaResponse, ProviderConfig, WireRequest, WireResponse};
use crate::transcripts::TranscriptStore;

/// How much prior conversation goes to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPolicy {
    /// Only the supplied turns; stateless per call.
    None,
    /// The channel's transcript-store turns are prepended to the supplied
    /// turns.
    RecentHistory,
}

/// How the provider's answer comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// One completed message.
    Sync,
    /// Fragments forwarded in arrival order as the provider produces them.
    Incremental,
}

/// The single configuration surface for requesting an assistant reply.
#[derive(Debug, Clone, Copy)]
pub struct ReplyOptions {
    pub context: ContextPolicy,
    pub delivery: Delivery,
}

impl ReplyOptions {
    /// The request/reply exchange: no history replay, one completed answer.
    pub const fn stateless_sync() -> Self {
        Self {
            context: ContextPolicy::None,
            delivery: Delivery::Sync,
        }
    }

    /// The chat stream: transcript context, fragments as they arrive.
    pub const fn contextual_incremental() -> Self {
        Self {
            context: ContextPolicy::RecentHistory,
            delivery: Delivery::Incremental,
        }
    }
}

const TEMPERATURE: f32 = 0.7;
const SYNC_MAX_TOKENS: u32 = 150;
const INCREMENTAL_MAX_TOKENS: u32 = 1000;

/// One frame of an incremental reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(String),
    Error(String),
    End,
}

/// A reply in the shape the chosen delivery mode produces.
#[derive(Debug)]
pub enum Reply {
    /// `Delivery::Sync`: the completed message text, trimmed, never empty.
    Full(String),
    /// `Delivery::Incremental`: fragments arrive on this receiver in
    /// provider order, terminated by [`StreamEvent::End`]. Once issued the
    /// request cannot be cancelled, and forwarded fragments are never
    /// retracted.
    Incremental(mpsc::UnboundedReceiver<StreamEvent>),
}

pub struct CompletionAdapter {
    client: reqwest::Client,
    config: ProviderConfig,
    transcripts: Arc<dyn TranscriptStore>,
}

impl CompletionAdapter {
    pub fn new(config: ProviderConfig, transcripts: Arc<dyn TranscriptStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            transcripts,
        }
    }

    pub fn transcripts(&self) -> &Arc<dyn TranscriptStore> {
        &self.transcripts
    }

    /// Request one assistant reply for a channel.
    ///
    /// `system`, when present, is always the first wire turn. With
    /// [`ContextPolicy::RecentHistory`] the channel's stored transcript sits
    /// between the system turn and the supplied turns.
    ///
    /// A missing key or a non-success provider status fails the call in both
    /// delivery modes, before any fragment is delivered. The empty-completion
    /// case is an error only in sync mode; an incremental stream that ends
    /// with zero content simply ends, and the caller substitutes the
    /// fallback text for the final message.
    pub async fn reply(
        &self,
        channel_id: &str,
        system: Option<&str>,
        turns: Vec<ChatTurn>,
        opts: ReplyOptions,
    ) -> Result<Reply, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingApiKey)?;

        let request = WireRequest {
            model: self.config.model.clone(),
            messages: self.wire_turns(channel_id, system, turns, opts.context),
            temperature: TEMPERATURE,
            max_tokens: match opts.delivery {
                Delivery::Sync => SYNC_MAX_TOKENS,
                Delivery::Incremental => INCREMENTAL_MAX_TOKENS,
            },
            stream: matches!(opts.delivery, Delivery::Incremental),
        };

        debug!(
            channel = channel_id,
            turns = request.messages.len(),
            stream = request.stream,
            "Requesting completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(CompletionError::UpstreamStatus { status, detail });
        }

        match opts.delivery {
            Delivery::Sync => {
                let body: WireResponse = response.json().await?;
                let content = body
                    .choices
                    .first()
                    .and_then(|choice| choice.message.content.as_deref())
                    .map(str::trim)
                    .unwrap_or_default();

                if content.is_empty() {
                    return Err(CompletionError::Empty);
                }
                Ok(Reply::Full(content.to_string()))
            }
            Delivery::Incremental => {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(forward_stream(response, tx));
                Ok(Reply::Incremental(rx))
            }
        }
    }

    fn wire_turns(
        &self,
        channel_id: &str,
        system: Option<&str>,
        turns: Vec<ChatTurn>,
        context: ContextPolicy,
    ) -> Vec<ChatTurn> {
        let mut messages = Vec::new();
        if let Some(instruction) = system {
            messages.push(ChatTurn::system(instruction));
        }
        if context == ContextPolicy::RecentHistory {
            messages.extend(self.transcripts.list(channel_id));
        }
        messages.extend(turns);
        messages
    }
}

/// Drains the provider's chunked response body and forwards each decoded
/// text fragment to the receiver, in arrival order. The loop ends on the
/// `[DONE]` sentinel, an in-stream error payload, or the body closing.
async fn forward_stream(response: reqwest::Response, tx: mpsc::UnboundedSender<StreamEvent>) {
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(e.to_string()));
                let _ = tx.send(StreamEvent::End);
                return;
            }
        };
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let line_str = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(s) => s.trim(),
                Err(e) => {
                    warn!("Invalid UTF-8 in provider stream: {e}");
                    buffer.drain(..=newline_pos);
                    continue;
                }
            };

            let should_end = process_sse_line(line_str, &tx);
            buffer.drain(..=newline_pos);
            if should_end {
                return;
            }
        }
    }

    // Provider closed the body without a [DONE] sentinel.
    let _ = tx.send(StreamEvent::End);
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

fn handle_data_payload(payload: &str, tx: &mpsc::UnboundedSender<StreamEvent>) -> bool {
    if payload == "[DONE]" {
        let _ = tx.send(StreamEvent::End);
        return true;
    }

    match serde_json::from_str::<DeltaResponse>(payload) {
        Ok(response) => {
            if let Some(choice) = response.choices.first() {
                if let Some(content) = &choice.delta.content {
                    let _ = tx.send(StreamEvent::Chunk(content.clone()));
                }
            }
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }

            let _ = tx.send(StreamEvent::Error(error_summary(payload)));
            let _ = tx.send(StreamEvent::End);
            true
        }
    }
}

fn process_sse_line(line: &str, tx: &mpsc::UnboundedSender<StreamEvent>) -> bool {
    extract_data_payload(line)
        .map(|payload| handle_data_payload(payload, tx))
        .unwrap_or(false)
}

/// Best-effort human-readable summary of an error payload the provider
/// slipped into the stream in place of a delta frame.
fn error_summary(payload: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
        if let Some(message) = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()))
        {
            return message.to_string();
        }
    }
    payload.trim().to_string()
}
