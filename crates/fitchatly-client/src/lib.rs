pub mod api;
pub mod error;
pub mod exchange;
pub mod pipeline;

pub use api::ApiClient;
pub use error::ClientError;
pub use exchange::{ExchangeState, InvalidTransition};
pub use pipeline::{DeliveryPipeline, PipelineEvent};
