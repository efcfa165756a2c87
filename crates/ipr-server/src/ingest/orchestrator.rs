//! Report creation orchestration
//!
//! Resolves the template and project references before anything is written,
//! then builds the whole report inside one transaction: the report row, the
//! creating-user binding, the project bindings, and every section. Any
//! failure after the transaction opens rolls everything back; the caller
//! either gets a fully-formed report or no report at all.

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use super::images::{self, IMAGE_UPLOAD_LIMIT_BYTES};
use super::models::{ReportUpload, VariantType};
use super::{genes, kb, sections, variants};

/// Errors raised while creating a report.
#[derive(Debug, Error)]
pub enum CreateReportError {
    #[error("Template '{0}' doesn't currently exist")]
    TemplateNotFound(String),

    #[error("Project '{0}' doesn't currently exist")]
    ProjectNotFound(String),

    #[error("Bad input. The variant key violated unique constraint (section={section}, key={key})")]
    DuplicateVariantKey { section: &'static str, key: String },

    #[error("Cannot link kb matches to variant type '{0}' as none were specified")]
    UnlinkableVariantType(VariantType),

    #[error("Invalid link (variant={key}): no '{variant_type}' variant definition exists")]
    InvalidVariantLink { variant_type: VariantType, key: String },

    #[error("Unable to bind creating user {user_id} to report: {source}")]
    UserBinding {
        user_id: Uuid,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unable to create section ({section}): {source}")]
    Section {
        section: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unable to load image '{key}': {source}")]
    Image {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Total image size {total} bytes exceeds the {limit} byte limit")]
    ImagesTooLarge { total: i64, limit: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A report-project binding attached to the creation result.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBinding {
    pub project_id: Uuid,
    pub name: String,
    pub additional_project: bool,
}

/// The persisted report returned to the caller, with its resolved projects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedReport {
    #[serde(skip_serializing)]
    pub id: Uuid,
    pub ident: Uuid,
    pub patient_id: String,
    pub biopsy_name: Option<String>,
    pub state: String,
    pub template_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub projects: Vec<ProjectBinding>,
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: Uuid,
    ident: Uuid,
    patient_id: String,
    biopsy_name: Option<String>,
    state: String,
    template_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ResolvedProject {
    id: Uuid,
    name: String,
    additional: bool,
}

async fn resolve_template(pool: &PgPool, name: &str) -> Result<Uuid, CreateReportError> {
    sqlx::query_scalar("SELECT id FROM templates WHERE LOWER(name) = LOWER($1)")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| CreateReportError::TemplateNotFound(name.to_string()))
}

async fn resolve_project(
    pool: &PgPool,
    name: &str,
    additional: bool,
) -> Result<ResolvedProject, CreateReportError> {
    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM projects WHERE LOWER(name) = LOWER(TRIM($1))")
            .bind(name)
            .fetch_optional(pool)
            .await?;

    let (id, name) = row.ok_or_else(|| CreateReportError::ProjectNotFound(name.to_string()))?;

    Ok(ResolvedProject {
        id,
        name,
        additional,
    })
}

/// Resolve the primary project and every additional project. All names are
/// checked before any write happens, so a typo in an additional project
/// aborts the upload before the report is touched.
async fn resolve_projects(
    pool: &PgPool,
    upload: &ReportUpload,
) -> Result<Vec<ResolvedProject>, CreateReportError> {
    let mut lookups = vec![resolve_project(pool, &upload.project, false)];
    lookups.extend(
        upload
            .additional_projects
            .iter()
            .map(|name| resolve_project(pool, name.as_str(), true)),
    );

    try_join_all(lookups).await
}

/// Create a report and all its sections from an upload payload.
///
/// Reference resolution happens against the pool before the transaction
/// opens; every write happens inside the transaction and is rolled back as a
/// unit on any failure.
#[tracing::instrument(
    skip(pool, upload),
    fields(
        template = %upload.template,
        project = %upload.project,
        patient = %upload.patient_id,
    )
)]
pub async fn create_report(
    pool: &PgPool,
    upload: ReportUpload,
) -> Result<CreatedReport, CreateReportError> {
    let (template_id, projects) = tokio::try_join!(
        resolve_template(pool, &upload.template),
        resolve_projects(pool, &upload)
    )?;

    let mut tx = pool.begin().await?;

    match build_report(&mut tx, template_id, &projects, &upload).await {
        Ok(report) => {
            tx.commit().await?;
            info!(ident = %report.ident, "report created");
            Ok(report)
        },
        Err(create_error) => {
            if let Err(rollback_error) = tx.rollback().await {
                error!(%rollback_error, "failed to roll back report creation transaction");
            }
            Err(create_error)
        },
    }
}

async fn build_report(
    tx: &mut Transaction<'_, Postgres>,
    template_id: Uuid,
    projects: &[ResolvedProject],
    upload: &ReportUpload,
) -> Result<CreatedReport, CreateReportError> {
    let report: ReportRow = sqlx::query_as(
        "INSERT INTO reports (patient_id, biopsy_name, template_id, created_by_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, ident, patient_id, biopsy_name, state, template_id, created_at",
    )
    .bind(&upload.patient_id)
    .bind(&upload.biopsy_name)
    .bind(template_id)
    .bind(upload.created_by_id)
    .fetch_one(&mut **tx)
    .await?;

    // Bind the creating user to the report as a bioinformatician.
    if let Some(user_id) = upload.created_by_id {
        sqlx::query(
            "INSERT INTO report_users (report_id, user_id, role, added_by_id) \
             VALUES ($1, $2, 'bioinformatician', $2)",
        )
        .bind(report.id)
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(|source| {
            error!(%user_id, "error binding creating user");
            CreateReportError::UserBinding { user_id, source }
        })?;
    }

    let bindings = bind_projects(tx, report.id, projects).await?;

    // Section construction in dependency order: genes first (variant rows
    // resolve symbols from the returned map), then the variant sections,
    // then everything with no cross-entity resolution, and finally the
    // knowledge-base links which need the completed key maps.
    let gene_map = genes::create_report_genes(tx, report.id, upload).await?;
    let variant_maps = variants::create_variant_sections(tx, report.id, &gene_map, upload).await?;
    sections::create_generic_sections(tx, report.id, upload).await?;

    let loaded_images = images::load_images(&upload.images).await?;
    images::insert_images(tx, report.id, &loaded_images).await?;

    kb::link_kb_matches(tx, report.id, &variant_maps, &upload.kb_matches).await?;

    let total_image_bytes = images::total_image_bytes(tx, report.id).await?;
    if total_image_bytes > IMAGE_UPLOAD_LIMIT_BYTES {
        return Err(CreateReportError::ImagesTooLarge {
            total: total_image_bytes,
            limit: IMAGE_UPLOAD_LIMIT_BYTES,
        });
    }

    Ok(CreatedReport {
        id: report.id,
        ident: report.ident,
        patient_id: report.patient_id,
        biopsy_name: report.biopsy_name,
        state: report.state,
        template_id: report.template_id,
        created_at: report.created_at,
        projects: bindings,
    })
}

/// Find-or-create the report-project association for every resolved project.
/// Repeating a project name in the upload reuses the existing binding row.
async fn bind_projects(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    projects: &[ResolvedProject],
) -> Result<Vec<ProjectBinding>, CreateReportError> {
    let mut bindings = Vec::with_capacity(projects.len());

    for project in projects {
        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM report_projects \
             WHERE report_id = $1 AND project_id = $2 AND additional_project = $3",
        )
        .bind(report_id)
        .bind(project.id)
        .bind(project.additional)
        .fetch_optional(&mut **tx)
        .await?;

        if existing.is_none() {
            sqlx::query(
                "INSERT INTO report_projects (report_id, project_id, additional_project) \
                 VALUES ($1, $2, $3)",
            )
            .bind(report_id)
            .bind(project.id)
            .bind(project.additional)
            .execute(&mut **tx)
            .await?;
        }

        bindings.push(ProjectBinding {
            project_id: project.id,
            name: project.name.clone(),
            additional_project: project.additional,
        });
    }

    Ok(bindings)
}
