//! HTTP surface for the login exchange.
//!
//! `GET /auth/callback?code=...` runs the exchange; `GET /health` reports
//! liveness. Every exchange response is JSON with a permissive
//! `Access-Control-Allow-Origin`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{RawQuery, State},
    http::{Request, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::exchange::{ExchangeResponse, LoginExchange};

/// Path of the OAuth redirect handler.
pub const CALLBACK_PATH: &str = "/auth/callback";

impl IntoResponse for ExchangeResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            self.body.to_string(),
        )
            .into_response()
    }
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8888)),
            request_logging: true,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }
}

/// Serves the login exchange over HTTP.
pub struct BridgeServer {
    config: ServerConfig,
    exchange: Arc<LoginExchange>,
}

impl BridgeServer {
    pub fn new(config: ServerConfig, exchange: LoginExchange) -> Self {
        Self {
            config,
            exchange: Arc::new(exchange),
        }
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .route("/health", get(handle_health))
            .with_state(self.exchange.clone());

        if self.config.request_logging {
            router.layer(TraceLayer::new_for_http().make_span_with(request_span))
        } else {
            router
        }
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    ///
    /// In-flight exchanges finish before this returns.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Starting login bridge");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Login bridge server failed"))?;

        tracing::info!(addr = %local_addr, "Login bridge stopped");
        Ok(())
    }
}

/// Span for one HTTP request. The query string carries the authorization
/// code, so only the path is recorded.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Handle GET /auth/callback
async fn handle_callback(
    State(exchange): State<Arc<LoginExchange>>,
    RawQuery(query): RawQuery,
) -> ExchangeResponse {
    let code = query.as_deref().and_then(code_param);
    exchange.handle_exchange(code.as_deref()).await
}

/// Handle GET /health
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "guildgate"
    }))
}

/// First `code` parameter of a query string, percent-decoded.
fn code_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
}
