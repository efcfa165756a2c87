//! Get report query
//!
//! Fetches one report by its external identifier, with its resolved project
//! bindings attached.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::ingest::ProjectBinding;

/// Query to fetch a single report by ident
#[derive(Debug, Clone, Copy)]
pub struct GetReportQuery {
    pub ident: Uuid,
}

/// Report details returned to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetail {
    pub ident: Uuid,
    pub patient_id: String,
    pub biopsy_name: Option<String>,
    pub state: String,
    pub template: String,
    pub created_at: DateTime<Utc>,
    pub projects: Vec<ProjectBinding>,
}

/// Errors that can occur when fetching a report
#[derive(Debug, thiserror::Error)]
pub enum GetReportError {
    #[error("Report '{0}' not found")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct ReportHeaderRow {
    id: Uuid,
    ident: Uuid,
    patient_id: String,
    biopsy_name: Option<String>,
    state: String,
    template: String,
    created_at: DateTime<Utc>,
}

/// Handler function for report retrieval
#[tracing::instrument(skip(pool), fields(ident = %query.ident))]
pub async fn handle(pool: PgPool, query: GetReportQuery) -> Result<ReportDetail, GetReportError> {
    let header: Option<ReportHeaderRow> = sqlx::query_as(
        "SELECT r.id, r.ident, r.patient_id, r.biopsy_name, r.state, \
                t.name AS template, r.created_at \
         FROM reports r \
         JOIN templates t ON t.id = r.template_id \
         WHERE r.ident = $1",
    )
    .bind(query.ident)
    .fetch_optional(&pool)
    .await?;

    let header = header.ok_or(GetReportError::NotFound(query.ident))?;

    let projects: Vec<ProjectBinding> = sqlx::query_as(
        "SELECT rp.project_id, p.name, rp.additional_project \
         FROM report_projects rp \
         JOIN projects p ON p.id = rp.project_id \
         WHERE rp.report_id = $1 \
         ORDER BY rp.additional_project, p.name",
    )
    .bind(header.id)
    .fetch_all(&pool)
    .await?;

    Ok(ReportDetail {
        ident: header.ident,
        patient_id: header.patient_id,
        biopsy_name: header.biopsy_name,
        state: header.state,
        template: header.template,
        created_at: header.created_at,
        projects,
    })
}
