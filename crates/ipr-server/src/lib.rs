//! IPR Server Library
//!
//! HTTP backend for managing clinical genomics reports.
//!
//! # Overview
//!
//! The IPR server stores structured oncology report data behind a REST API:
//!
//! - **Report ingestion**: a single nested upload payload is materialized
//!   into a full report (header, section tables, gene dictionary, variant
//!   tables, knowledge-base match graph) under one transaction
//! - **Database Management**: PostgreSQL integration with SQLx
//! - **Configuration**: environment-based configuration management
//! - **Middleware**: CORS and request logging
//!
//! # Architecture
//!
//! Feature slices follow a command/query split: commands are pure data
//! structures validated up front and executed by standalone handler
//! functions; queries are read-only lookups. The heavy lifting of report
//! creation lives in [`ingest`], which builds every report section inside a
//! single database transaction so a failed upload leaves nothing behind.
//!
//! # Example
//!
//! ```no_run
//! use ipr_server::{config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     # let _ = pool;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, AppResult};
