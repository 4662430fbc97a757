//! HTTP server module
//!
//! Provides the Axum-based HTTP server for serving metrics.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::collector::{Collector, JolokiaClient};
use crate::config::Config;
use crate::transformer::{RuleSet, TransformEngine};

/// Header carrying the configured application version
pub const APP_VERSION_HEADER: &str = "x-app-version";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Bulk reader plus rule engine
    pub collector: Arc<Collector<JolokiaClient>>,
    /// Reported in `X-App-Version`
    pub app_version: Arc<str>,
}

impl AppState {
    /// Build the state for `config`, with an already validated rule set
    pub fn new(config: Config, rules: RuleSet, app_version: impl Into<Arc<str>>) -> Result<Self> {
        let client = JolokiaClient::from_config(&config.jolokia)?;
        let collector = Collector::new(client, TransformEngine::new(rules));

        Ok(Self {
            config: Arc::new(config),
            collector: Arc::new(collector),
            app_version: app_version.into(),
        })
    }
}

/// Build the router: `/`, `/health` and the configured metrics path
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.server.path.clone();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(&metrics_path, get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
///
/// # Arguments
/// * `config` - Validated application configuration
/// * `rules` - Rules built from `config.rules`
/// * `app_version` - Value of the `X-App-Version` header
///
/// # Errors
/// Returns an error if the server fails to start
pub async fn run(config: Config, rules: RuleSet, app_version: String) -> Result<()> {
    let bind_address = config.server.bind_address.clone();
    let port = config.server.port;
    let metrics_path = config.server.path.clone();
    let warmup = config.server.warmup;

    let state = AppState::new(config, rules, app_version)?;

    if warmup {
        let collector = Arc::clone(&state.collector);
        tokio::spawn(async move {
            match collector.collect().await {
                Ok(lines) => info!(lines = lines.len(), "Warm-up collection complete"),
                Err(e) => warn!(error = %e, "Warm-up collection failed"),
            }
        });
    }

    let app = router(state);

    // Handle "localhost" specially, otherwise parse as IP address
    let bind_addr: std::net::IpAddr = if bind_address == "localhost" {
        std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
    } else {
        bind_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.", bind_address, e))?
    };
    let addr = SocketAddr::from((bind_addr, port));
    info!(address = %addr, metrics_path = %metrics_path, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
