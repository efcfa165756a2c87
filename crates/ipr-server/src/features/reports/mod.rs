//! Report feature slice
//!
//! - `commands/` - report creation (the transactional ingestion entry point)
//! - `queries/` - report retrieval
//! - `routes.rs` - HTTP route definitions

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::reports_routes;
