//! REST API over the dashboard evaluation.
//!
//! Provides three GET endpoints:
//! - `/report`: the full dashboard report
//! - `/dispatch?price=<f64>`: live dispatch at a what-if price
//! - `/backtest?window=<24h|7d|30d>`: state-of-charge backtest summary
//!
//! Every request builds its own [`Session`] from the `x-dashboard-password`
//! header.

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::get;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::market::SnapshotSource;
use crate::session::Session;

pub use types::{BacktestQuery, DispatchQuery, DispatchResponse, ErrorResponse};

/// Header carrying the dashboard password.
pub const PASSWORD_HEADER: &str = "x-dashboard-password";

/// Application state shared across all request handlers.
///
/// The scenario is immutable; the snapshot source does its own caching.
pub struct AppState {
    /// Validated scenario.
    pub config: ScenarioConfig,
    /// Where each request's market snapshot comes from.
    pub source: Box<dyn SnapshotSource>,
}

impl AppState {
    pub fn new(config: ScenarioConfig, source: impl SnapshotSource + 'static) -> Self {
        Self {
            config,
            source: Box::new(source),
        }
    }

    fn session(&self, headers: &HeaderMap) -> Session {
        let supplied = headers.get(PASSWORD_HEADER).and_then(|v| v.to_str().ok());
        Session::authenticate(&self.config.access, supplied)
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/report", get(handlers::get_report))
        .route("/dispatch", get(handlers::get_dispatch))
        .route("/backtest", get(handlers::get_backtest))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
