//! Report ingestion pipeline
//!
//! Materializes a full report from one nested upload payload: header row,
//! project and user bindings, gene dictionary, variant section tables, the
//! knowledge-base match/statement graph, generic sections, and image blobs.
//! Everything runs under a single transaction opened by the orchestrator;
//! there is no partial-success state.
//!
//! Construction order is dictated by natural-key resolution: the gene
//! dictionary must exist before variant rows can resolve gene symbols, and
//! every variant section must be written before knowledge-base matches can
//! resolve upload keys to row ids. The maps carrying those resolutions are
//! plain in-memory values built once and handed down the pipeline; nothing
//! re-reads the database for a value it just wrote.

pub mod genes;
pub mod images;
pub mod kb;
pub mod models;
pub mod orchestrator;
pub mod sections;
pub mod variants;

pub use models::{ReportUpload, VariantType};
pub use orchestrator::{create_report, CreateReportError, CreatedReport, ProjectBinding};
