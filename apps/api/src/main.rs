mod access;
mod ai;
mod analytics;
mod audit;
mod auth;
mod candidates;
mod config;
mod db;
mod errors;
mod interviews;
mod llm_client;
mod messages;
mod models;
mod notifications;
mod organizations;
mod response;
mod resumes;
mod routes;
mod state;
mod storage;
mod technical;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::auth::PgAccountStatus;
use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::llm_client::{ChatCompletion, DisabledClient, LlmClient};
use crate::notifications::HttpNotifier;
use crate::organizations::PgOrganizationStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{build_s3_client, S3ObjectStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TalentIQ API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize S3 / MinIO
    let storage = S3ObjectStore::new(build_s3_client(&config).await, config.s3_bucket.clone());
    info!("S3 client initialized");

    // Initialize the chat client; without a key every AI feature serves its fallback
    let ai: Arc<dyn ChatCompletion> = match config.openai_api_key.clone() {
        Some(key) => {
            let client = LlmClient::new(key)?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Arc::new(client)
        }
        None => {
            warn!("OPENAI_API_KEY not set; AI features will use fallbacks");
            Arc::new(DisabledClient)
        }
    };

    // Initialize email / SMS delivery
    let notifier = HttpNotifier::from_config(&config)?;
    info!(
        email = notifier.email_enabled(),
        sms = notifier.sms_enabled(),
        "Notifier initialized"
    );

    let organizations = Arc::new(PgOrganizationStore::new(db.clone()));
    let accounts = Arc::new(PgAccountStatus::new(db.clone()));

    // Build app state
    let state = AppState {
        db,
        storage: Arc::new(storage),
        ai,
        notifier: Arc::new(notifier),
        organizations,
        accounts,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
