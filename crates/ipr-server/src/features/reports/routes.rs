//! Report API routes
//!
//! - `POST /api/v1/reports` - Create a report from a full upload payload
//! - `GET /api/v1/reports/:ident` - Get a single report by ident

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api::response::ApiResponse;
use crate::error::AppError;

use super::commands::CreateReportCommand;
use super::queries::GetReportQuery;

/// Creates the reports router with all routes configured
pub fn reports_routes() -> Router<PgPool> {
    Router::new()
        .route("/", post(create_report))
        .route("/:ident", get(get_report))
}

/// Create a report from an upload payload
///
/// # Response
///
/// - `201 Created` - Report and all sections created
/// - `400 Bad Request` - Validation failure or malformed upload content
/// - `404 Not Found` - Unknown template or project name
/// - `500 Internal Server Error` - Persistence failure (rolled back)
#[tracing::instrument(
    skip(pool, command),
    fields(template = %command.upload.template, project = %command.upload.project)
)]
async fn create_report(
    State(pool): State<PgPool>,
    Json(command): Json<CreateReportCommand>,
) -> Result<Response, AppError> {
    let report = super::commands::create::handle(pool, command).await?;

    tracing::info!(ident = %report.ident, "Report created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(report))).into_response())
}

/// Get a single report by ident
///
/// # Response
///
/// - `200 OK` - Report found
/// - `404 Not Found` - No report with this ident
#[tracing::instrument(skip(pool))]
async fn get_report(
    State(pool): State<PgPool>,
    Path(ident): Path<Uuid>,
) -> Result<Response, AppError> {
    let report = super::queries::get::handle(pool, GetReportQuery { ident }).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(report))).into_response())
}
