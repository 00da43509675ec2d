use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion provider API key is not configured")]
    MissingApiKey,

    #[error("completion provider returned {status}: {detail}")]
    UpstreamStatus { status: u16, detail: String },

    #[error("completion provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered successfully but with nothing usable.
    #[error("completion provider returned no content")]
    Empty,
}
