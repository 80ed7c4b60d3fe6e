// ---------------------------------------------------------------------------
// HTTP API server
// ---------------------------------------------------------------------------
//
// Exposes the scanner, IP lookup, DNS resolver and command guard as JSON
// endpoints. `/metrics` serves the Prometheus registry.

mod handlers;
pub mod response;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::dns::DnsResolver;
use crate::lookup::IpLookupClient;
use crate::metrics;
use crate::scanner::{PortProbeEngine, PortSet};
use crate::tools::{Allowlist, CommandGuard};

/// Request bodies are tiny `{ "command": ... }` documents
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Shared, read-only state behind every handler
#[derive(Debug)]
pub struct AppState {
    pub engine: PortProbeEngine,
    pub ports: PortSet,
    pub guard: CommandGuard,
    pub lookup: IpLookupClient,
    pub dns: DnsResolver,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            engine: PortProbeEngine::new(config.scan_options()),
            ports: config.scanner.ports.clone(),
            guard: CommandGuard::new(config.commands.allowed.clone(), config.guard_config()),
            lookup: config.lookup_client(),
            dns: DnsResolver::from_system_conf(),
            metrics_enabled: config.metrics.enabled,
        }
    }

    /// Replace the allowlist, keeping the configured limits
    pub fn with_allowlist(mut self, allowlist: Allowlist) -> Self {
        self.guard = CommandGuard::new(allowlist, self.guard.config().clone());
        self
    }
}

/// Build the axum Router (useful for testing).
pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/scan", get(handlers::scan))
        .route("/api/lookup", get(handlers::lookup))
        .route("/api/dns", get(handlers::dns))
        .route("/api/execute", post(handlers::execute))
        .route("/api/commands", get(handlers::list_commands))
        .route("/api/tools", get(handlers::list_tools))
        .route("/api/tools/{id}", get(handlers::get_tool))
        .route("/api/tools/category/{name}", get(handlers::tools_in_category));

    if state.metrics_enabled {
        router = router.route("/metrics", get(handlers::metrics_handler));
    }

    router
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the API server and block until shutdown (Ctrl+C).
pub async fn start_server(config: Config) -> Result<()> {
    if config.metrics.enabled {
        metrics::init().context("Failed to initialize metrics")?;
    }

    let addr: SocketAddr = config.server_addr()?;
    let state = Arc::new(AppState::from_config(&config));
    info!(
        ports = state.ports.len(),
        commands = state.guard.allowlist().len(),
        "netprobe state ready"
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("API server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
