//! Per-channel conversation context for history-aware completions.
//!
//! The store is injected into the adapter at wiring time: development and
//! test configurations pass [`MemoryTranscripts`], production passes
//! [`NoTranscripts`] (the database is the authoritative record there, and
//! the history-replay behavior is a development aid). Business logic never
//! branches on an environment flag.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use fitchatly_types::api::ChatTurn;

pub trait TranscriptStore: Send + Sync {
    fn append(&self, channel_id: &str, turn: ChatTurn);
    fn list(&self, channel_id: &str) -> Vec<ChatTurn>;
    fn clear(&self, channel_id: &str);
}

/// Process-local per-channel turn buffer. Lifecycle is tied to the process;
/// a restart forgets everything.
#[derive(Default)]
pub struct MemoryTranscripts {
    channels: Mutex<HashMap<String, Vec<ChatTurn>>>,
}

impl MemoryTranscripts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranscriptStore for MemoryTranscripts {
    fn append(&self, channel_id: &str, turn: ChatTurn) {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels.entry(channel_id.to_string()).or_default().push(turn);
    }

    fn list(&self, channel_id: &str) -> Vec<ChatTurn> {
        let channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels.get(channel_id).cloned().unwrap_or_default()
    }

    fn clear(&self, channel_id: &str) {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels.remove(channel_id);
    }
}

/// History disabled: appends are dropped, listings are empty.
pub struct NoTranscripts;

impl TranscriptStore for NoTranscripts {
    fn append(&self, _channel_id: &str, _turn: ChatTurn) {}

    fn list(&self, _channel_id: &str) -> Vec<ChatTurn> {
        Vec::new()
    }

    fn clear(&self, _channel_id: &str) {}
}
