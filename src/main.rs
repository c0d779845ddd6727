use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod generator;
mod handlers;
mod models;
mod registry;
mod store;

use generator::CodeGenerator;
use registry::LinkRegistry;
use store::JsonFileStore;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub registry: LinkRegistry,
    pub config: config::AppConfig,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (ignore error if file is absent; env vars may already be set)
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkbox=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting linkbox on {}", config.bind_addr());

    let store = JsonFileStore::new(&config.links_file);
    let generator = CodeGenerator::new(config.code_length);
    tracing::info!("Links file: {}", store.path().display());
    tracing::info!("Generated short codes are {} characters", generator.length());

    // Nothing is writing yet, so any temp file next to the links file is
    // left over from an interrupted save.
    store.sweep_stale_temp_files().await?;

    let registry = LinkRegistry::new(store, generator).read_through(config.read_through);

    // Load (or create) the links file now so a corrupt file stops startup
    // instead of surfacing on the first request.
    let links = registry.snapshot().await?;
    if links.is_empty() {
        tracing::info!("Link store is empty");
    } else {
        tracing::info!("Loaded {} link(s)", links.len());
    }

    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState { registry, config });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ── Router ─────────────────────────────────────────────────────────────────

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::links::index))
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        .route(
            "/links",
            get(handlers::links::list_links).post(handlers::links::create_link),
        )
        .route("/submit", post(handlers::links::submit))
        // Short-link redirect; static routes above take priority
        .route("/:code", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
