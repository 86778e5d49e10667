//! InternHub Server - HTTP API over the service layer
//!
//! - `/health` liveness probe
//! - `/api/...` JSON resources, bearer-token authenticated
//! - In-memory store persisted as periodic JSON snapshots
//!
//! # Example
//!
//! ```rust,no_run
//! use internhub_server::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     internhub_server::serve(config).await
//! }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use crate::config::{Config, ServerConfig, StorageConfig};
use crate::error::ApiError;
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, Uri};
use axum::Router;
use internhub_service::{InternHub, LocalDiskStore};
use internhub_store::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    // already installed (tests, embedding) is fine
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

/// Full application router
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .merge(routes::health())
        .nest("/api", routes::api())
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.cors_origins))
        .with_state(state)
}

/// Load the store, prepare document storage and bootstrap the first admin
pub fn build_hub(config: &Config) -> Result<InternHub> {
    let store = match &config.storage.snapshot_path {
        Some(path) => Store::load_snapshot(path)
            .with_context(|| format!("Failed to load snapshot: {}", path.display()))?,
        None => Store::new(),
    };
    let documents_dir = &config.storage.documents_dir;
    std::fs::create_dir_all(documents_dir).with_context(|| {
        format!("Failed to create documents dir: {}", documents_dir.display())
    })?;

    let hub = InternHub::new(
        Arc::new(store),
        Arc::new(LocalDiskStore::new(documents_dir)),
        config.token_signer()?,
        config.settings(),
    );

    match (
        &config.auth.bootstrap_admin_email,
        &config.auth.bootstrap_admin_password,
    ) {
        (Some(email), Some(password)) => {
            hub.auth()
                .bootstrap_admin(email, password)
                .context("Failed to bootstrap admin account")?;
        }
        _ if hub.store().users.is_empty() => {
            warn!("no users exist and no bootstrap admin is configured");
        }
        _ => {}
    }
    Ok(hub)
}

/// Write the store to `storage.snapshot_path` every `snapshot_interval_secs`
fn spawn_snapshot_flush(hub: &InternHub, storage: &StorageConfig) -> Option<JoinHandle<()>> {
    let path = storage.snapshot_path.clone()?;
    if storage.snapshot_interval_secs == 0 {
        return None;
    }
    let store = Arc::clone(hub.store());
    let period = Duration::from_secs(storage.snapshot_interval_secs);

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let store = Arc::clone(&store);
            let path = path.clone();
            match tokio::task::spawn_blocking(move || store.save_snapshot(&path)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "periodic snapshot failed"),
                Err(e) => warn!(error = %e, "snapshot task did not finish"),
            }
        }
    }))
}

/// Run the server until Ctrl-C or SIGTERM, then write a final snapshot
pub async fn serve(config: Config) -> Result<()> {
    let hub = build_hub(&config)?;
    let app = build_router(AppState::new(hub.clone()), &config.server);
    let flusher = spawn_snapshot_flush(&hub, &config.storage);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "internhub listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(task) = flusher {
        task.abort();
    }
    if let Some(path) = &config.storage.snapshot_path {
        hub.store()
            .save_snapshot(path)
            .with_context(|| format!("Failed to write final snapshot: {}", path.display()))?;
        info!(path = %path.display(), stats = ?hub.store().stats(), "final snapshot written");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
