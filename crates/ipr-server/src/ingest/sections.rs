//! Generic report section writers
//!
//! Everything report-owned that needs no cross-entity resolution: the report
//! id is attached to every row and the rows are bulk-inserted. The section
//! list is declared statically; a payload key outside this list (and outside
//! the variant/gene/kb/image sections handled elsewhere) is simply ignored.
//!
//! Two content transforms apply here: analyst comments are sanitized to an
//! allow-listed HTML subset, and therapeutic targets get a positional rank.

use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::features::shared::sanitize::sanitize_html;

use super::models::{
    section_rows, AnalystCommentsInput, ComparatorInput, GenomicAlterationInput, HlaTypeInput,
    ImmuneCellTypeInput, MicrobialInput, MutationBurdenInput, PatientInformationInput,
    ReportUpload, SampleInfoInput, TherapeuticTargetInput,
};
use super::orchestrator::CreateReportError;

fn section_error(section: &'static str) -> impl FnOnce(sqlx::Error) -> CreateReportError {
    move |source| CreateReportError::Section { section, source }
}

/// Pair each therapeutic target with its positional rank.
fn ranked(targets: &[TherapeuticTargetInput]) -> Vec<(i32, &TherapeuticTargetInput)> {
    targets
        .iter()
        .enumerate()
        .map(|(index, target)| (index as i32, target))
        .collect()
}

async fn insert_patient_information(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    info: &PatientInformationInput,
) -> Result<(), CreateReportError> {
    sqlx::query(
        "INSERT INTO patient_information (report_id, physician, gender, age, case_type, \
         diagnosis, biopsy_site) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(report_id)
    .bind(&info.physician)
    .bind(&info.gender)
    .bind(&info.age)
    .bind(&info.case_type)
    .bind(&info.diagnosis)
    .bind(&info.biopsy_site)
    .execute(&mut **tx)
    .await
    .map_err(section_error("patientInformation"))?;

    Ok(())
}

async fn insert_sample_info(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[SampleInfoInput],
) -> Result<(), CreateReportError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO sample_info (report_id, sample, sample_name, biopsy_site, biopsy_type, \
         primary_site, patho_tc, collection_date) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(&row.sample)
            .push_bind(&row.sample_name)
            .push_bind(&row.biopsy_site)
            .push_bind(&row.biopsy_type)
            .push_bind(&row.primary_site)
            .push_bind(&row.patho_tc)
            .push_bind(&row.collection_date);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(section_error("sampleInfo"))?;

    Ok(())
}

async fn insert_analyst_comments(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    comments: &AnalystCommentsInput,
) -> Result<(), CreateReportError> {
    // Free-text HTML field; structured fields are never sanitized.
    let cleaned = comments.comments.as_deref().map(sanitize_html);

    sqlx::query("INSERT INTO analyst_comments (report_id, comments) VALUES ($1, $2)")
        .bind(report_id)
        .bind(cleaned)
        .execute(&mut **tx)
        .await
        .map_err(section_error("analystComments"))?;

    Ok(())
}

async fn insert_therapeutic_targets(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[TherapeuticTargetInput],
) -> Result<(), CreateReportError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO therapeutic_targets (report_id, type, rank, gene, gene_graphkb_id, \
         variant, variant_graphkb_id, therapy, context, evidence_level) ",
    );
    qb.push_values(ranked(rows), |mut b, (rank, target)| {
        b.push_bind(report_id)
            .push_bind(&target.target_type)
            .push_bind(rank)
            .push_bind(&target.gene)
            .push_bind(&target.gene_graphkb_id)
            .push_bind(&target.variant)
            .push_bind(&target.variant_graphkb_id)
            .push_bind(&target.therapy)
            .push_bind(&target.context)
            .push_bind(&target.evidence_level);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(section_error("therapeuticTargets"))?;

    Ok(())
}

async fn insert_mutation_burden(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[MutationBurdenInput],
) -> Result<(), CreateReportError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO mutation_burden (report_id, role, coding_snv_count, coding_indel_count, \
         quality_sv_count) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(&row.role)
            .push_bind(row.coding_snv_count)
            .push_bind(row.coding_indel_count)
            .push_bind(row.quality_sv_count);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(section_error("mutationBurden"))?;

    Ok(())
}

async fn insert_comparators(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[ComparatorInput],
) -> Result<(), CreateReportError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO comparators (report_id, analysis_role, name, version) ");
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(&row.analysis_role)
            .push_bind(&row.name)
            .push_bind(&row.version);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(section_error("comparators"))?;

    Ok(())
}

async fn insert_microbial(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[MicrobialInput],
) -> Result<(), CreateReportError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO microbial (report_id, species, integration_site) ");
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(&row.species)
            .push_bind(&row.integration_site);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(section_error("microbial"))?;

    Ok(())
}

async fn insert_hla_types(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[HlaTypeInput],
) -> Result<(), CreateReportError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO hla_types (report_id, library, pathology, a1, a2, b1, b2, c1, c2) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(&row.library)
            .push_bind(&row.pathology)
            .push_bind(&row.a1)
            .push_bind(&row.a2)
            .push_bind(&row.b1)
            .push_bind(&row.b2)
            .push_bind(&row.c1)
            .push_bind(&row.c2);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(section_error("hlaTypes"))?;

    Ok(())
}

async fn insert_immune_cell_types(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[ImmuneCellTypeInput],
) -> Result<(), CreateReportError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO immune_cell_types (report_id, cell_type, kb_category, score, percentile) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(&row.cell_type)
            .push_bind(&row.kb_category)
            .push_bind(row.score)
            .push_bind(row.percentile);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(section_error("immuneCellTypes"))?;

    Ok(())
}

async fn insert_genomic_alterations(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[GenomicAlterationInput],
) -> Result<(), CreateReportError> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO genomic_alterations_identified (report_id, gene_variant) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id).push_bind(&row.gene_variant);
    });

    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(section_error("genomicAlterationsIdentified"))?;

    Ok(())
}

/// Write every declared generic section present in the upload.
pub async fn create_generic_sections(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    content: &ReportUpload,
) -> Result<(), CreateReportError> {
    if let Some(info) = &content.patient_information {
        insert_patient_information(tx, report_id, info).await?;
    }
    insert_sample_info(tx, report_id, section_rows(&content.sample_info)).await?;
    if let Some(comments) = &content.analyst_comments {
        insert_analyst_comments(tx, report_id, comments).await?;
    }
    insert_therapeutic_targets(tx, report_id, section_rows(&content.therapeutic_targets)).await?;
    insert_mutation_burden(tx, report_id, section_rows(&content.mutation_burden)).await?;
    insert_comparators(tx, report_id, section_rows(&content.comparators)).await?;
    insert_microbial(tx, report_id, section_rows(&content.microbial)).await?;
    insert_hla_types(tx, report_id, section_rows(&content.hla_types)).await?;
    insert_immune_cell_types(tx, report_id, section_rows(&content.immune_cell_types)).await?;
    insert_genomic_alterations(
        tx,
        report_id,
        section_rows(&content.genomic_alterations_identified),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_follow_array_order() {
        let targets: Vec<TherapeuticTargetInput> = serde_json::from_str(
            r#"[
                {"gene": "EGFR", "therapy": "erlotinib"},
                {"gene": "KRAS", "therapy": "sotorasib"},
                {"gene": "ALK", "therapy": "crizotinib"}
            ]"#,
        )
        .unwrap();

        let ranked = ranked(&targets);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 0);
        assert_eq!(ranked[0].1.gene.as_deref(), Some("EGFR"));
        assert_eq!(ranked[2].0, 2);
        assert_eq!(ranked[2].1.gene.as_deref(), Some("ALK"));
    }

    #[test]
    fn test_ranks_empty_input() {
        assert!(ranked(&[]).is_empty());
    }
}
