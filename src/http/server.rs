//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener and serve until shutdown
//!
//! # Routes
//! - `POST <any path>` → proxied chat completion
//! - `GET /health` → liveness
//! - `GET /`, `GET /status` → HTML status page
//! - anything else on a known path → 405

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::diagnostics::DiagnosticsState;
use crate::error::ProxyError;
use crate::http::handler::{health_check, method_not_allowed, proxy_handler, status_page};
use crate::http::request::UuidRequestId;
use crate::lifecycle::shutdown;
use crate::upstream::{UpstreamClient, UpstreamProbe};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub upstream: UpstreamClient,
    pub probe: UpstreamProbe,
    pub diagnostics: Arc<DiagnosticsState>,
    /// Parent of every request's token; cancelled on shutdown.
    pub streams: CancellationToken,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let probe = UpstreamProbe::new(&config.upstream);
        let diagnostics = Arc::new(DiagnosticsState::new(
            config.diagnostics.request_log_capacity,
        ));

        Ok(Self {
            config: Arc::new(config),
            upstream,
            probe,
            diagnostics,
            streams: CancellationToken::new(),
        })
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let state = AppState::new(config)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_check).post(proxy_handler))
            .route("/status", get(status_page).post(proxy_handler))
            .route("/", get(status_page).post(proxy_handler))
            .route("/{*path}", post(proxy_handler))
            .method_not_allowed_fallback(method_not_allowed)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.state.upstream.endpoint(),
            api_version = %self.state.upstream.api_version(),
            "HTTP server starting"
        );

        let streams = self.state.streams.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown::wait(shutdown_rx).await;
                tracing::info!("Shutdown requested; closing open streams");
                streams.cancel();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared diagnostics of this server.
    pub fn diagnostics(&self) -> Arc<DiagnosticsState> {
        self.state.diagnostics.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.state.config
    }
}
