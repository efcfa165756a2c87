//! Feature modules implementing the IPR API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes. Commands are plain data structures validated up front and executed
//! by standalone handler functions; queries are read-only lookups. Routes
//! invoke the handlers directly.

pub mod reports;
pub mod shared;

use axum::Router;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
}

/// Creates the main API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/reports", reports::reports_routes().with_state(state.db.clone()))
}
