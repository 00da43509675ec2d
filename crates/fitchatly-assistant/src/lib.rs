pub mod adapter;
pub mod error;
pub mod provider;
pub mod transcripts;

pub use adapter::{
    CompletionAdapter, ContextPolicy, Delivery, Reply, ReplyOptions, StreamEvent,
};
pub use error::CompletionError;
pub use provider::{ProviderConfig, FALLBACK_REPLY};
pub use transcripts::{MemoryTranscripts, NoTranscripts, TranscriptStore};
