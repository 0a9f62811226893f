//! fbc-chat - lead-qualification chat backend
//!
//! A Rust backend driving a scripted sales conversation: a pure stage
//! machine at the core, with text generation, voice synthesis, realtime
//! broadcast, and lead persistence around it.

mod api;
mod capabilities;
mod company;
mod db;
mod leads;
mod llm;
mod realtime;
mod runtime;
mod stage_machine;
mod voice;

use api::{create_router, AppState};
use db::LeadStore;
use llm::{GeminiModel, GeminiService, LoggingService, TextGenService};
use realtime::BroadcastHub;
use runtime::TurnOrchestrator;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice::{ElevenLabsVoice, VoiceSynthesis};

/// Environment-driven configuration
struct AppConfig {
    gemini_api_key: Option<String>,
    gemini_model: GeminiModel,
    elevenlabs_api_key: Option<String>,
    elevenlabs_voice_id: Option<String>,
    db_path: String,
    port: u16,
}

impl AppConfig {
    fn from_env() -> Self {
        let db_path = std::env::var("FBC_DB_PATH").unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            format!("{home}/.fbc-chat/leads.db")
        });

        let port: u16 = std::env::var("FBC_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        let gemini_model = match std::env::var("GEMINI_MODEL").ok().as_deref() {
            Some("pro") => GeminiModel::Pro,
            _ => GeminiModel::Flash,
        };

        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            gemini_model,
            elevenlabs_api_key: std::env::var("ELEVENLABS_API_KEY").ok(),
            elevenlabs_voice_id: std::env::var("ELEVENLABS_VOICE_ID").ok(),
            db_path,
            port,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fbc_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path, "Opening lead store");
    let store = LeadStore::open(&config.db_path)?;

    // Text generation
    let gemini_api_key = config
        .gemini_api_key
        .ok_or("GEMINI_API_KEY is required")?;
    let gemini = GeminiService::new(gemini_api_key, config.gemini_model)?;
    let llm: Arc<dyn TextGenService> = Arc::new(LoggingService::new(Arc::new(gemini)));
    tracing::info!(model = llm.model_id(), "text generation initialized");

    // Voice synthesis is optional; without keys the service runs text-only
    let voice: Option<Arc<dyn VoiceSynthesis>> =
        match (config.elevenlabs_api_key, config.elevenlabs_voice_id) {
            (Some(api_key), Some(voice_id)) => {
                tracing::info!(voice_id = %voice_id, "voice synthesis initialized");
                Some(Arc::new(ElevenLabsVoice::new(api_key, voice_id)?))
            }
            _ => {
                tracing::warn!(
                    "ELEVENLABS_API_KEY / ELEVENLABS_VOICE_ID not set, replies are text-only"
                );
                None
            }
        };

    let hub = Arc::new(BroadcastHub::new());
    let orchestrator = Arc::new(TurnOrchestrator::new(llm, voice, hub, store));
    let state = AppState::new(orchestrator);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state).layer(cors).layer(compression);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("fbc-chat listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
