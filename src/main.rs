//! altgen - API-key-gated credential dispenser.
//!
//! This is a REST API server that issues per-owner API keys and dispenses
//! items from a finite credential inventory ("alts"), one per successful
//! generate call, with a per-key cooldown and per-caller in-flight
//! deduplication.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: SQLite with sqlx (async queries); sole arbiter of key
//!   uniqueness and inventory atomicity
//! - **Authentication**: opaque per-owner API keys; a distinguished admin
//!   key gates restocking
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create the data directory and SQLite connection pool
//! 3. Run database migrations
//! 4. Bootstrap the admin key (logged once on first provisioning)
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod inflight;
mod middleware;
mod models;
mod services;
mod state;

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool inside the data directory
    let pool = db::create_pool(&config.data_dir).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Bootstrap the admin key; on first startup the fresh key is logged for
    // operator retrieval
    services::key_service::ensure_admin_key(&pool).await?;

    let state = AppState::new(pool, config.cooldown_secs);

    // Admin-only routes, guarded by the admin key middleware
    let admin_routes = Router::new()
        .route("/api/v1/restock", post(handlers::restock::restock))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    let app = Router::new()
        // Public routes
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/status", get(handlers::status::status))
        .route("/api/v1/keys", post(handlers::keys::create_key))
        .route("/api/v1/validate", get(handlers::validate::validate))
        .route("/api/v1/generate", get(handlers::generate::generate))
        // Merge admin routes
        .merge(admin_routes)
        // Add request tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state (pool, in-flight set, cooldown) with all handlers
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests. ConnectInfo exposes the client address,
    // which the generate endpoint uses as its deduplication identity.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
