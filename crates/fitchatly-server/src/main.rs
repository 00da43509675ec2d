use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use fitchatly_api::{AppState, AppStateInner};
use fitchatly_assistant::{
    CompletionAdapter, MemoryTranscripts, NoTranscripts, ProviderConfig, TranscriptStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitchatly=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("FITCHATLY_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("FITCHATLY_DB_PATH").unwrap_or_else(|_| "fitchatly.db".into());
    let host = std::env::var("FITCHATLY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FITCHATLY_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let defaults = ProviderConfig::default();
    let provider = ProviderConfig {
        api_key: std::env::var("OPENAI_API_KEY").ok(),
        base_url: std::env::var("FITCHATLY_PROVIDER_URL").unwrap_or(defaults.base_url),
        model: std::env::var("FITCHATLY_MODEL").unwrap_or(defaults.model),
    };
    if provider.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; assistant replies will fail");
    }

    // Dev transcript buffer for the incremental chat route; `off` makes the
    // route rely solely on the history the client sends.
    let transcripts: Arc<dyn TranscriptStore> =
        match std::env::var("FITCHATLY_TRANSCRIPTS").as_deref() {
            Ok("off") => Arc::new(NoTranscripts),
            _ => Arc::new(MemoryTranscripts::new()),
        };

    // Init database
    let db = fitchatly_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let adapter = CompletionAdapter::new(provider, transcripts);
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        adapter,
    });

    let app = fitchatly_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("FitChatly server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
