use serde::{Deserialize, Serialize};

use fitchatly_types::api::ChatTurn;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Substituted as the final message when an incremental stream completes
/// without producing any content, so the caller never receives an empty
/// reply. Outright provider failures still propagate as errors.
pub const FALLBACK_REPLY: &str = "I'm having trouble connecting to my brain right now. This might be due to:\n\n\
    1. API key configuration issues\n\
    2. Your account needs billing verification\n\
    3. The API is experiencing high traffic\n\n\
    Please try again later or check the API key settings.";

/// Connection settings for the hosted completion API.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Absent key fails every request with a configuration error; no mode
    /// ever degrades to a fabricated reply.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

// OpenAI-compatible wire format. Requests are identical in both delivery
// modes apart from the `stream` flag; responses differ: the synchronous
// shape carries `message.content`, stream frames carry `delta.content`.

#[derive(Serialize)]
pub(crate) struct WireRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Deserialize)]
pub(crate) struct WireResponse {
    pub choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
pub(crate) struct WireChoice {
    pub message: WireMessage,
}

#[derive(Deserialize)]
pub(crate) struct WireMessage {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct DeltaResponse {
    pub choices: Vec<DeltaChoice>,
}

#[derive(Deserialize)]
pub(crate) struct DeltaChoice {
    pub delta: Delta,
}

#[derive(Deserialize)]
pub(crate) struct Delta {
    pub content: Option<String>,
}
