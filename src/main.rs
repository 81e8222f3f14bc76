//! Okey counter relay
//!
//! Forwards captured tile photos to the image-understanding service and
//! returns the extracted payload.

use okey_counter::{
    state::{AppConfig, AppState},
    web_api,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "okey_counter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Okey counter relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        host = %config.host,
        port = config.port,
        gemini_model = %config.gemini_model,
        gemini_base_url = %config.gemini_base_url,
        timeout_sec = config.request_timeout.as_secs(),
        service_configured = config.gemini_api_key.is_some(),
        "Configuration loaded"
    );

    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, analyze requests will fail as misconfigured");
    }

    let state = AppState::from_config(config)?;
    let addr = state.config.addr();

    let app = web_api::create_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
