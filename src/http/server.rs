//! Edge HTTP server.
//!
//! # Responsibilities
//! - Create the Axum router; every method and path goes to the edge handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Dispatch each request, then forward it to the chosen origin
//! - Serve plain TCP or TLS with graceful shutdown

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::edge::{Dispatcher, EdgeOutcome, EdgeRequest};
use crate::http::forward::Forwarder;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::observability::metrics;

/// Errors that stop a server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid bind address '{0}'")]
    Address(String),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// State shared by edge handlers.
#[derive(Clone)]
pub struct EdgeState {
    pub dispatcher: Arc<Dispatcher>,
    pub forwarder: Forwarder,
}

/// The edge listener.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    pub fn new(config: ProxyConfig, dispatcher: Arc<Dispatcher>) -> Result<Self, ServerError> {
        let state = EdgeState {
            dispatcher,
            forwarder: Forwarder::new(&config)?,
        };
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: EdgeState) -> Router {
        Router::new()
            .fallback(edge_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
                    .map_response(|res: Response<_>| res.map(Body::new))
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size)),
            )
    }

    /// The fully layered router, for embedding or tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Serve plain HTTP on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Edge server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Edge server stopped");
        Ok(())
    }

    /// Serve HTTPS on the configured bind address until `shutdown` fires.
    pub async fn run_tls(self, tls: RustlsConfig, mut shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let bind = &self.config.listener.bind_address;
        let addr: SocketAddr = bind.parse().map_err(|_| ServerError::Address(bind.clone()))?;

        let handle = axum_server::Handle::new();
        let signal = handle.clone();
        let drain = Duration::from_secs(self.config.timeouts.request_secs);
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            signal.graceful_shutdown(Some(drain));
        });

        tracing::info!(address = %addr, "Edge server starting (TLS)");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("Edge server stopped");
        Ok(())
    }
}

/// Dispatch, then forward. Every method and path ends up here.
async fn edge_handler(State(state): State<EdgeState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();
    let method = parts.method.to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %parts.uri,
        "Dispatching request"
    );

    let edge_request = EdgeRequest::from_parts(&parts.method, &parts.uri, &parts.headers);
    let settings = state.dispatcher.settings();

    let (response, route_kind) = match state.dispatcher.dispatch(edge_request).await {
        EdgeOutcome::Reject { status, message } => ((status, message).into_response(), "rejected"),
        EdgeOutcome::Forward { request, route } => {
            let kind = route.as_ref().map(|r| r.kind.as_str()).unwrap_or("default");
            let response = state.forwarder.forward(request, body, &settings, &request_id).await;
            (response, kind)
        }
    };

    metrics::record_request(&method, response.status().as_u16(), route_kind, start);
    response
}
