//! # Endpoint
//!
//! Downstream HTTP surface: one SSE stream per viewer plus a health check.
//!
//! Responsibilities:
//! - Register a channel per viewer and stream broadcaster frames to it
//! - Send the reconnect hint first and a ping every liveness period
//! - Tear the channel down on disconnect or when it is removed elsewhere

mod error;
mod health;
mod stream;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use contracts::{ServerConfig, UpstreamStatus};
use dispatcher::Broadcaster;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::{EndpointError, Result};
pub use health::HealthReport;
pub use stream::event_stream;

/// Shared handler state
#[derive(Clone)]
pub struct EndpointState {
    pub broadcaster: Broadcaster,
    pub server: ServerConfig,
    /// Upstream view for `/healthz`; absent when running without a hub
    pub upstream: Option<Arc<dyn UpstreamStatus>>,
    /// Cancelled on process shutdown; parent of every viewer's liveness loop
    pub shutdown: CancellationToken,
}

impl EndpointState {
    pub fn new(broadcaster: Broadcaster, server: ServerConfig) -> Self {
        Self {
            broadcaster,
            server,
            upstream: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_upstream(mut self, upstream: Arc<dyn UpstreamStatus>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Build the router: `<server.path>` and `/healthz`
pub fn router(state: EndpointState) -> Router {
    Router::new()
        .route(&state.server.path, get(stream::event_stream))
        .route("/healthz", get(health::healthz))
        .with_state(state)
}

/// Bind the listener for `server.bind`
pub async fn bind(address: &str) -> Result<TcpListener> {
    TcpListener::bind(address)
        .await
        .map_err(|source| EndpointError::Bind {
            address: address.to_string(),
            source,
        })
}

/// Serve until `state.shutdown` fires
///
/// Open viewer streams never finish on their own, so shutdown closes every
/// channel to let graceful shutdown complete.
pub async fn serve(listener: TcpListener, state: EndpointState) -> Result<()> {
    let shutdown = state.shutdown.clone();
    let broadcaster = state.broadcaster.clone();
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, path = %state.server.path, "Endpoint listening");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            broadcaster.close_all();
        })
        .await?;

    info!("Endpoint stopped");
    Ok(())
}
