pub mod create;

pub use create::{CreateReportCommand, CreateReportCommandError};
