//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

use axum::{middleware as axum_middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthService, SessionManager};
use crate::ledger::Ledger;

pub use routes::create_router;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub auth: AuthService,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    /// Wire the identity service to the ledger's store and the given sessions.
    pub fn new(ledger: Ledger, sessions: Arc<SessionManager>) -> Self {
        let auth = AuthService::new(ledger.store().clone(), sessions.clone());
        Self {
            ledger,
            auth,
            sessions,
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Layers run outermost-first: trace -> logging -> (session) -> handler
    create_router(state.clone())
        .route("/health", get(health_check))
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
