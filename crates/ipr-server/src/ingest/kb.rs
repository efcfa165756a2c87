//! Knowledge-base match and statement linking
//!
//! Matches arrive addressed by (variant type, upload key) and must resolve to
//! a concrete variant row created earlier in the same transaction. Statement
//! content is de-duplicated per report through find-or-create, and matches
//! join to their statement through an explicit join row.
//!
//! The loop is strictly sequential: find-or-create is a read-then-write on
//! the statement table, and two matches carrying identical statement content
//! must land on a single statement row.

use sqlx::{Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::models::{KbMatchInput, KbStatementContent};
use super::orchestrator::CreateReportError;
use super::variants::VariantKeyMaps;

fn kb_error(source: sqlx::Error) -> CreateReportError {
    CreateReportError::Section {
        section: "kbMatches",
        source,
    }
}

/// Find an existing statement row with identical content for this report, or
/// create one. Content equality is NULL-safe across every statement column.
async fn find_or_create_statement(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    statement: &KbStatementContent,
) -> Result<Uuid, CreateReportError> {
    let existing: Option<Uuid> = sqlx::query_scalar(
        "SELECT id FROM kb_matched_statements \
         WHERE report_id = $1 \
           AND category IS NOT DISTINCT FROM $2 \
           AND approved_therapy IS NOT DISTINCT FROM $3 \
           AND disease IS NOT DISTINCT FROM $4 \
           AND relevance IS NOT DISTINCT FROM $5 \
           AND context IS NOT DISTINCT FROM $6 \
           AND status IS NOT DISTINCT FROM $7 \
           AND reference IS NOT DISTINCT FROM $8 \
           AND evidence_level IS NOT DISTINCT FROM $9 \
           AND matched_cancer = $10 \
           AND kb_statement_id IS NOT DISTINCT FROM $11",
    )
    .bind(report_id)
    .bind(&statement.category)
    .bind(&statement.approved_therapy)
    .bind(&statement.disease)
    .bind(&statement.relevance)
    .bind(&statement.context)
    .bind(&statement.status)
    .bind(&statement.reference)
    .bind(&statement.evidence_level)
    .bind(statement.matched_cancer.unwrap_or(false))
    .bind(&statement.kb_statement_id)
    .fetch_optional(&mut **tx)
    .await
    .map_err(kb_error)?;

    if let Some(id) = existing {
        return Ok(id);
    }

    sqlx::query_scalar(
        "INSERT INTO kb_matched_statements (report_id, category, approved_therapy, disease, \
         relevance, context, status, reference, evidence_level, matched_cancer, kb_statement_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING id",
    )
    .bind(report_id)
    .bind(&statement.category)
    .bind(&statement.approved_therapy)
    .bind(&statement.disease)
    .bind(&statement.relevance)
    .bind(&statement.context)
    .bind(&statement.status)
    .bind(&statement.reference)
    .bind(&statement.evidence_level)
    .bind(statement.matched_cancer.unwrap_or(false))
    .bind(&statement.kb_statement_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(kb_error)
}

/// Create the match rows, their de-duplicated statements, and the join rows
/// tying them together.
///
/// Every match must resolve: a variant type whose section was never supplied
/// is unlinkable, and a key absent from its section map is an invalid link.
/// A match never silently attaches to nothing.
pub async fn link_kb_matches(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    variant_maps: &VariantKeyMaps,
    matches: &[KbMatchInput],
) -> Result<(), CreateReportError> {
    for entry in matches {
        let section_map = variant_maps
            .get(&entry.variant_type)
            .ok_or(CreateReportError::UnlinkableVariantType(entry.variant_type))?;

        let variant_id = *section_map.get(&entry.variant).ok_or_else(|| {
            CreateReportError::InvalidVariantLink {
                variant_type: entry.variant_type,
                key: entry.variant.clone(),
            }
        })?;

        let match_id: Uuid = sqlx::query_scalar(
            "INSERT INTO kb_matches (report_id, variant_type, variant_id, kb_variant, kb_variant_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(report_id)
        .bind(entry.variant_type.as_str())
        .bind(variant_id)
        .bind(&entry.kb_variant)
        .bind(&entry.kb_variant_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(kb_error)?;

        if entry.statement.is_empty() {
            continue;
        }

        let statement_id = find_or_create_statement(tx, report_id, &entry.statement).await?;

        sqlx::query(
            "INSERT INTO kb_match_join (report_id, kb_match_id, kb_matched_statement_id) \
             VALUES ($1, $2, $3)",
        )
        .bind(report_id)
        .bind(match_id)
        .bind(statement_id)
        .execute(&mut **tx)
        .await
        .map_err(kb_error)?;

        debug!(%match_id, %statement_id, "linked kb match to statement");
    }

    Ok(())
}
