//! LLM Gatekeeper - Main Application Entry Point
//!
//! Request gatekeeper for a multi-tenant LLM proxy gateway. For every inbound
//! API request it resolves the caller's API key, decides whether the owning
//! account is entitled to consume the service right now, and serves a merged
//! view of the models upstream connections have registered.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: API key with SHA-256 hashing, layered funding checks
//! - **Model Registry**: in-memory, lock-guarded, copy-on-read
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Start the background worker
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    config::SettingsHandle,
    services::{
        background::BackgroundQueue, gate::Gate, model_events::ModelEventHub,
        model_registry::ModelRegistry, model_seeder::ModelSeeder,
    },
    state::AppState,
    store::{GateStore, postgres::PgStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    let settings = SettingsHandle::new(config.gate_settings());
    tracing::info!(bypass = ?settings.load().bypass_prefixes, "Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let store: Arc<dyn GateStore> = Arc::new(PgStore::new(pool));
    let (background, _worker) = BackgroundQueue::spawn(config.background_limits());

    let state = AppState {
        gate: Gate::new(settings.clone(), store.clone(), background.clone()),
        events: ModelEventHub::new(
            Arc::new(ModelRegistry::new()),
            ModelSeeder::new(store.clone()),
            background,
        ),
        store,
    };

    spawn_settings_reload(settings);

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Re-read `.env` on SIGHUP and swap in new gate settings.
#[cfg(unix)]
fn spawn_settings_reload(settings: SettingsHandle) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "SIGHUP handler unavailable, settings reload disabled");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            match config::Config::reload() {
                Ok(config) => {
                    settings.store(config.gate_settings());
                    tracing::info!("Gate settings reloaded");
                }
                Err(err) => tracing::warn!(error = %err, "settings reload failed, keeping previous"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_settings_reload(_settings: SettingsHandle) {}
