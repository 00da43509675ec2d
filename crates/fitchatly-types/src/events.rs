use serde::{Deserialize, Serialize};

// Named frames emitted by the incremental chat endpoint. The event name
// travels in the SSE `event:` field; these are the `data:` payloads.

pub const EVENT_OPEN: &str = "open";
pub const EVENT_USER_MESSAGE: &str = "userMessage";
pub const EVENT_CHUNK: &str = "chunk";
pub const EVENT_DONE: &str = "done";
pub const EVENT_ERROR: &str = "error";

/// Payload of the initial `open` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOpen {
    pub message: String,
}

/// Payload of the `userMessage` echo frame and the final `done` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMessageFrame {
    pub id: String,
    pub content: String,
    pub role: String,
}

/// Payload of each `chunk` frame: one text fragment, in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    pub role: String,
}

/// Payload of the `error` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamError {
    pub message: String,
    pub details: String,
}
