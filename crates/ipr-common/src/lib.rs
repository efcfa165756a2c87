//! IPR Common Library
//!
//! Shared infrastructure for the IPR workspace members:
//!
//! - **Error Handling**: the shared error type and result alias
//! - **Logging**: tracing subscriber configuration and initialization
//! - **Checksums**: content integrity digests for stored blobs

pub mod checksum;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{IprError, Result};
