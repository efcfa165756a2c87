//! Create report command
//!
//! Thin command wrapper over the ingestion pipeline: validates the reference
//! fields of the upload payload, then hands the payload to the transactional
//! orchestrator. All heavy lifting (gene dictionary, variant sections, the
//! knowledge-base graph) happens in [`crate::ingest`].

use serde::Deserialize;
use sqlx::PgPool;

use crate::features::shared::validation::{validate_name, NameValidationError};
use crate::ingest::{self, CreateReportError, CreatedReport, ReportUpload};

/// Command to create a report from an upload payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReportCommand {
    #[serde(flatten)]
    pub upload: ReportUpload,
}

/// Errors that can occur when creating a report
#[derive(Debug, thiserror::Error)]
pub enum CreateReportCommandError {
    #[error("Upload validation failed: {0}")]
    Validation(#[from] NameValidationError),

    #[error(transparent)]
    Ingest(#[from] CreateReportError),
}

impl CreateReportCommand {
    /// Validates the reference fields of the upload
    ///
    /// # Errors
    ///
    /// - template, project, and patient id must be non-empty and within
    ///   length limits
    /// - every additional project name must be non-empty
    pub fn validate(&self) -> Result<(), CreateReportCommandError> {
        validate_name(&self.upload.template, "template", 255)?;
        validate_name(&self.upload.project, "project", 255)?;
        validate_name(&self.upload.patient_id, "patientId", 255)?;

        for name in &self.upload.additional_projects {
            validate_name(name, "additionalProjects entry", 255)?;
        }

        Ok(())
    }
}

/// Handler function for report creation
///
/// # Errors
///
/// - Validation errors if reference fields are malformed
/// - Every ingestion error from [`crate::ingest::create_report`]; any failure
///   after the transaction opens has already been rolled back when it
///   surfaces here
#[tracing::instrument(
    skip(pool, command),
    fields(
        template = %command.upload.template,
        project = %command.upload.project,
    )
)]
pub async fn handle(
    pool: PgPool,
    command: CreateReportCommand,
) -> Result<CreatedReport, CreateReportCommandError> {
    command.validate()?;

    tracing::info!("Creating report");

    let report = ingest::create_report(&pool, command.upload).await?;

    tracing::info!(ident = %report.ident, "Report created successfully");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_from(json: serde_json::Value) -> CreateReportCommand {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_validation_success() {
        let cmd = command_from(serde_json::json!({
            "template": "Genomic",
            "project": "ProjectX",
            "patientId": "PAT01",
        }));
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_template() {
        let cmd = command_from(serde_json::json!({
            "template": "  ",
            "project": "ProjectX",
            "patientId": "PAT01",
        }));
        assert!(matches!(
            cmd.validate(),
            Err(CreateReportCommandError::Validation(_))
        ));
    }

    #[test]
    fn test_validation_empty_additional_project() {
        let cmd = command_from(serde_json::json!({
            "template": "Genomic",
            "project": "ProjectX",
            "patientId": "PAT01",
            "additionalProjects": ["ProjectY", ""],
        }));
        assert!(matches!(
            cmd.validate(),
            Err(CreateReportCommandError::Validation(_))
        ));
    }

    #[test]
    fn test_command_deserializes_nested_sections() {
        let cmd = command_from(serde_json::json!({
            "template": "Genomic",
            "project": "ProjectX",
            "patientId": "PAT01",
            "expressionVariants": [{"gene": "EGFR", "key": "e1"}],
            "kbMatches": [{"variantType": "exp", "variant": "e1"}],
        }));
        assert_eq!(cmd.upload.kb_matches.len(), 1);
        assert_eq!(cmd.upload.kb_matches[0].variant, "e1");
    }
}
