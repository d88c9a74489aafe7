//! hrm-ui library interface
//!
//! Exposes the application state and router so integration tests can
//! drive the HTTP surface without a running binary.

pub mod api;
pub mod config;
pub mod error;
pub mod session;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use hrm_common::ConfidencePolicy;
use session::SessionStore;

/// Sessions idle longer than this are dropped.
pub const SESSION_TTL_MINUTES: i64 = 480;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Browser sessions
    pub sessions: SessionStore,
    /// Confidence policy, loaded once at startup
    pub policy: Arc<ConfidencePolicy>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, policy: ConfidencePolicy) -> Self {
        Self {
            db,
            sessions: SessionStore::new(SESSION_TTL_MINUTES),
            policy: Arc::new(policy),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::session_routes())
        .merge(api::wizard_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
