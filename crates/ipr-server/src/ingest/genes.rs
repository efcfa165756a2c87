//! Report-scoped gene dictionary construction
//!
//! Gene symbols referenced by the variant sections have no database identity
//! at upload time. All distinct symbols are collected, created in one bulk
//! insert, and handed back as a name-to-id map that the variant writers use
//! for synchronous foreign-key resolution.

use std::collections::{BTreeMap, HashMap};

use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::models::{section_rows, GeneInput, ReportUpload};
use super::orchestrator::CreateReportError;

#[derive(Debug, sqlx::FromRow)]
struct GeneRow {
    id: Uuid,
    name: String,
}

/// Gather every distinct gene definition referenced by the upload.
///
/// Symbols from the gene-linked variant sections are collected first as bare
/// entries; structural variants contribute both breakpoint partners. Explicit
/// `genes` entries are applied last so their annotations win on a name
/// collision.
fn collect_gene_definitions(content: &ReportUpload) -> BTreeMap<String, GeneInput> {
    let mut definitions = BTreeMap::new();

    for variant in section_rows(&content.structural_variants) {
        for symbol in [&variant.gene1, &variant.gene2].into_iter().flatten() {
            definitions.insert(symbol.clone(), GeneInput::named(symbol));
        }
    }
    for variant in section_rows(&content.copy_variants) {
        if let Some(symbol) = &variant.gene {
            definitions.insert(symbol.clone(), GeneInput::named(symbol));
        }
    }
    for variant in section_rows(&content.expression_variants) {
        if let Some(symbol) = &variant.gene {
            definitions.insert(symbol.clone(), GeneInput::named(symbol));
        }
    }
    for variant in section_rows(&content.small_mutations) {
        if let Some(symbol) = &variant.gene {
            definitions.insert(symbol.clone(), GeneInput::named(symbol));
        }
    }
    for variant in section_rows(&content.protein_variants) {
        if let Some(symbol) = &variant.gene {
            definitions.insert(symbol.clone(), GeneInput::named(symbol));
        }
    }
    for result in section_rows(&content.probe_results) {
        if let Some(symbol) = &result.gene {
            definitions.insert(symbol.clone(), GeneInput::named(symbol));
        }
    }

    for gene in &content.genes {
        definitions.insert(gene.name.clone(), gene.clone());
    }

    definitions
}

/// Create the gene dictionary for a report and return the name-to-id map.
///
/// The map must be complete before any variant row is written; a failure here
/// aborts the whole ingestion.
pub async fn create_report_genes(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    content: &ReportUpload,
) -> Result<HashMap<String, Uuid>, CreateReportError> {
    let definitions = collect_gene_definitions(content);

    if definitions.is_empty() {
        return Ok(HashMap::new());
    }

    debug!(count = definitions.len(), "creating gene definitions for the report");

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO genes (report_id, name, oncogene, tumour_suppressor, \
         drug_targetable, known_fusion_partner, therapeutic_associated) ",
    );

    query_builder.push_values(definitions.values(), |mut b, gene| {
        b.push_bind(report_id)
            .push_bind(&gene.name)
            .push_bind(gene.oncogene)
            .push_bind(gene.tumour_suppressor)
            .push_bind(gene.drug_targetable)
            .push_bind(gene.known_fusion_partner)
            .push_bind(gene.therapeutic_associated);
    });
    query_builder.push(" RETURNING id, name");

    let rows: Vec<GeneRow> = query_builder
        .build_query_as()
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| CreateReportError::Section {
            section: "genes",
            source: e,
        })?;

    Ok(rows.into_iter().map(|row| (row.name, row.id)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::models::{OneOrMany, StructuralVariantInput};

    fn upload_from(json: serde_json::Value) -> ReportUpload {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_collects_singular_gene_fields() {
        let upload = upload_from(serde_json::json!({
            "template": "Genomic",
            "project": "ProjectX",
            "patientId": "PAT01",
            "expressionVariants": [{"gene": "EGFR"}, {"gene": "TP53"}],
            "copyVariants": [{"gene": "TP53"}]
        }));

        let definitions = collect_gene_definitions(&upload);
        assert_eq!(definitions.len(), 2);
        assert!(definitions.contains_key("EGFR"));
        assert!(definitions.contains_key("TP53"));
    }

    #[test]
    fn test_structural_variants_contribute_both_partners() {
        let upload = upload_from(serde_json::json!({
            "template": "Genomic",
            "project": "ProjectX",
            "patientId": "PAT01",
            "structuralVariants": [{"gene1": "EML4", "gene2": "ALK"}]
        }));

        let definitions = collect_gene_definitions(&upload);
        assert_eq!(definitions.len(), 2);
        assert!(definitions.contains_key("EML4"));
        assert!(definitions.contains_key("ALK"));
    }

    #[test]
    fn test_intergenic_breakpoint_partner_skipped() {
        let mut upload = upload_from(serde_json::json!({
            "template": "Genomic",
            "project": "ProjectX",
            "patientId": "PAT01"
        }));
        upload.structural_variants = Some(OneOrMany::Many(vec![StructuralVariantInput {
            key: None,
            gene1: Some("RET".to_string()),
            gene2: None,
            exon1: None,
            exon2: None,
            breakpoint: None,
            event_type: None,
            detected_in: None,
            conventional_name: None,
            frame: None,
            omic_support: false,
            svg_title: None,
        }]));

        let definitions = collect_gene_definitions(&upload);
        assert_eq!(definitions.len(), 1);
        assert!(definitions.contains_key("RET"));
    }

    #[test]
    fn test_explicit_genes_override_collected_symbols() {
        let upload = upload_from(serde_json::json!({
            "template": "Genomic",
            "project": "ProjectX",
            "patientId": "PAT01",
            "smallMutations": [{"gene": "KRAS"}],
            "genes": [{"name": "KRAS", "oncogene": true}]
        }));

        let definitions = collect_gene_definitions(&upload);
        assert_eq!(definitions.len(), 1);
        assert!(definitions["KRAS"].oncogene);
    }

    #[test]
    fn test_empty_upload_collects_nothing() {
        let upload = upload_from(serde_json::json!({
            "template": "Genomic",
            "project": "ProjectX",
            "patientId": "PAT01"
        }));
        assert!(collect_gene_definitions(&upload).is_empty());
    }
}
