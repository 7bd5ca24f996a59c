//! HTTP layer for the deduplication service.
//!
//! Thin plumbing over [`DedupService`]: routing, query/body extraction,
//! URL-encoding of keys for the wire, and mapping the error taxonomy onto
//! status codes with JSON error pages.
//!
//! # Endpoints
//!
//! - `POST /api/add` - record a submission, respond with its key
//! - `GET /api/get?key=` - stored body plus a `duplicates` field
//! - `DELETE /api/remove?key=` - delete an entry
//! - `PUT /api/update?key=` - rekey an entry onto a new payload
//! - `GET /api/statistic` - duplicate rate percentage
//! - `GET /health` - liveness probe

use std::sync::Arc;

use tower_http::trace::TraceLayer;

use crate::service::DedupService;

pub mod error;
pub mod handlers;

pub use error::ApiError;

/// Shared application state.
///
/// Passed to all handlers via axum's `State` extractor. Wraps the service
/// (and through it the injected storage handle) in an `Arc` so cloning per
/// request is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// The deduplication core.
    service: DedupService,
}

impl AppState {
    /// Creates a new `AppState` around the given service.
    #[must_use]
    pub fn new(service: DedupService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { service }),
        }
    }

    /// Returns the deduplication service.
    #[must_use]
    pub fn service(&self) -> &DedupService {
        &self.inner.service
    }
}

/// Builds the axum Router with all endpoints.
#[must_use]
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{delete, get, post, put};

    axum::Router::new()
        .route("/api/add", post(handlers::add_handler))
        .route("/api/get", get(handlers::get_handler))
        .route("/api/remove", delete(handlers::remove_handler))
        .route("/api/update", put(handlers::update_handler))
        .route("/api/statistic", get(handlers::statistic_handler))
        .route("/health", get(handlers::health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Binds `host:port` and serves the API until the task is cancelled.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(app_state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(app_state);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "dedup service listening");

    axum::serve(listener, app).await
}
