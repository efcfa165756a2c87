//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::features::reports::commands::create::CreateReportCommandError;
use crate::features::reports::queries::get::GetReportError;
use crate::ingest::CreateReportError;

/// Result type alias for route handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Application error type mapped onto HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
            },
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "A database error occurred".to_string(),
                )
            },
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl From<CreateReportError> for AppError {
    fn from(err: CreateReportError) -> Self {
        match err {
            // Reference resolution failures are client input errors.
            CreateReportError::TemplateNotFound(_) | CreateReportError::ProjectNotFound(_) => {
                AppError::NotFound(err.to_string())
            },
            // Malformed upload content, rejected before or during the write.
            CreateReportError::DuplicateVariantKey { .. }
            | CreateReportError::UnlinkableVariantType(_)
            | CreateReportError::InvalidVariantLink { .. }
            | CreateReportError::ImagesTooLarge { .. } => AppError::BadRequest(err.to_string()),
            CreateReportError::Database(e) => AppError::Database(e),
            CreateReportError::UserBinding { .. }
            | CreateReportError::Section { .. }
            | CreateReportError::Image { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<CreateReportCommandError> for AppError {
    fn from(err: CreateReportCommandError) -> Self {
        match err {
            CreateReportCommandError::Validation(e) => AppError::Validation(e.to_string()),
            CreateReportCommandError::Ingest(e) => e.into(),
        }
    }
}

impl From<GetReportError> for AppError {
    fn from(err: GetReportError) -> Self {
        match err {
            GetReportError::NotFound(ident) => {
                AppError::NotFound(format!("Report '{}' not found", ident))
            },
            GetReportError::Database(e) => AppError::Database(e),
        }
    }
}
