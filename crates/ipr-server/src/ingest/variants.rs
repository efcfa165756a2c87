//! Variant section writers
//!
//! Each variant type has its own table and its own row shape; what they share
//! is the upload convention: rows may carry a transient `key` (unique within
//! the section) and reference genes by symbol. Writers validate key
//! uniqueness before touching the database, resolve gene symbols through the
//! gene dictionary map (an unresolved symbol leaves the foreign key unset),
//! strip the routing fields, bulk-insert preserving input order, and return
//! the key-to-row-id map the knowledge-base linker consumes.

use std::collections::{HashMap, HashSet};

use sqlx::{Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::models::{
    section_rows, CopyVariantInput, ExpressionVariantInput, MsiInput, ProbeResultInput,
    ProteinVariantInput, ReportUpload, SignatureVariantInput, SmallMutationInput,
    StructuralVariantInput, TmbInput, VariantType,
};
use super::orchestrator::CreateReportError;

/// Upload-key to created-row-id map for one variant section.
pub type KeyMap = HashMap<String, Uuid>;

/// Key maps for every variant section that was present in the upload.
///
/// A section that was never supplied has no entry at all; the linker treats
/// a match against such a type as unlinkable rather than merely unresolved.
pub type VariantKeyMaps = HashMap<VariantType, KeyMap>;

/// Reject a section whose rows repeat a `key` value. Runs before any insert
/// for the section so a violation leaves nothing behind.
fn check_unique_keys<'a>(
    section: &'static str,
    keys: impl Iterator<Item = Option<&'a str>>,
) -> Result<(), CreateReportError> {
    let mut seen = HashSet::new();
    for key in keys.flatten() {
        if !seen.insert(key) {
            return Err(CreateReportError::DuplicateVariantKey {
                section,
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Build the key map from input order and the ids returned by the insert.
/// Row N of the insert corresponds to row N of the input, so the zip is
/// positional; rows without a key are simply not addressable.
fn key_map<'a>(keys: impl Iterator<Item = Option<&'a String>>, ids: &[Uuid]) -> KeyMap {
    keys.zip(ids.iter())
        .filter_map(|(key, id)| key.map(|k| (k.clone(), *id)))
        .collect()
}

fn resolve_gene(gene_map: &HashMap<String, Uuid>, symbol: &Option<String>) -> Option<Uuid> {
    symbol.as_deref().and_then(|s| gene_map.get(s)).copied()
}

fn section_error(section: &'static str) -> impl FnOnce(sqlx::Error) -> CreateReportError {
    move |source| CreateReportError::Section { section, source }
}

async fn insert_structural_variants(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    gene_map: &HashMap<String, Uuid>,
    rows: &[StructuralVariantInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO structural_variants (report_id, gene1_id, gene2_id, exon1, exon2, \
         breakpoint, event_type, detected_in, conventional_name, frame, omic_support, svg_title) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(resolve_gene(gene_map, &row.gene1))
            .push_bind(resolve_gene(gene_map, &row.gene2))
            .push_bind(&row.exon1)
            .push_bind(&row.exon2)
            .push_bind(&row.breakpoint)
            .push_bind(&row.event_type)
            .push_bind(&row.detected_in)
            .push_bind(&row.conventional_name)
            .push_bind(&row.frame)
            .push_bind(row.omic_support)
            .push_bind(&row.svg_title);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("structuralVariants"))
}

async fn insert_copy_variants(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    gene_map: &HashMap<String, Uuid>,
    rows: &[CopyVariantInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO copy_variants (report_id, gene_id, copy_change, loh_state, cnv_state, \
         chromosome_band, start_position, end_position, size, kb_category) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(resolve_gene(gene_map, &row.gene))
            .push_bind(row.copy_change)
            .push_bind(&row.loh_state)
            .push_bind(&row.cnv_state)
            .push_bind(&row.chromosome_band)
            .push_bind(row.start_position)
            .push_bind(row.end_position)
            .push_bind(row.size)
            .push_bind(&row.kb_category);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("copyVariants"))
}

async fn insert_expression_variants(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    gene_map: &HashMap<String, Uuid>,
    rows: &[ExpressionVariantInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO expression_variants (report_id, gene_id, location, rpkm, tpm, \
         expression_state, primary_site_fold_change, kb_category) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(resolve_gene(gene_map, &row.gene))
            .push_bind(&row.location)
            .push_bind(row.rpkm)
            .push_bind(row.tpm)
            .push_bind(&row.expression_state)
            .push_bind(row.primary_site_fold_change)
            .push_bind(&row.kb_category);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("expressionVariants"))
}

async fn insert_small_mutations(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    gene_map: &HashMap<String, Uuid>,
    rows: &[SmallMutationInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO small_mutations (report_id, gene_id, transcript, protein_change, \
         chromosome, start_position, end_position, ref_seq, alt_seq, zygosity, hgvs_protein, \
         hgvs_cds, hgvs_genomic, germline, tumour_alt_count, tumour_ref_count) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(resolve_gene(gene_map, &row.gene))
            .push_bind(&row.transcript)
            .push_bind(&row.protein_change)
            .push_bind(&row.chromosome)
            .push_bind(row.start_position)
            .push_bind(row.end_position)
            .push_bind(&row.ref_seq)
            .push_bind(&row.alt_seq)
            .push_bind(&row.zygosity)
            .push_bind(&row.hgvs_protein)
            .push_bind(&row.hgvs_cds)
            .push_bind(&row.hgvs_genomic)
            .push_bind(row.germline)
            .push_bind(row.tumour_alt_count)
            .push_bind(row.tumour_ref_count);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("smallMutations"))
}

async fn insert_protein_variants(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    gene_map: &HashMap<String, Uuid>,
    rows: &[ProteinVariantInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO protein_variants (report_id, gene_id, percentile, kiqr, comparator, \
         total_sample_observed, secondary_percentile) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(resolve_gene(gene_map, &row.gene))
            .push_bind(row.percentile)
            .push_bind(row.kiqr)
            .push_bind(&row.comparator)
            .push_bind(row.total_sample_observed)
            .push_bind(row.secondary_percentile);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("proteinVariants"))
}

async fn insert_signature_variants(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[SignatureVariantInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO signature_variants (report_id, signature_name, activity, kb_category) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(&row.signature_name)
            .push_bind(&row.activity)
            .push_bind(&row.kb_category);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("signatureVariants"))
}

async fn insert_msi(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[MsiInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO msi (report_id, score, kb_category) ");
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(row.score)
            .push_bind(&row.kb_category);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("msi"))
}

async fn insert_tmb(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    rows: &[TmbInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO tmbur_mutation_burden (report_id, genome_snvs, genome_indels, \
         non_n_bases_in_1_to_22_and_x_and_y, adjusted_tmb, adjusted_tmb_comment, kb_category) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(row.genome_snvs)
            .push_bind(row.genome_indels)
            .push_bind(&row.non_n_bases)
            .push_bind(row.adjusted_tmb)
            .push_bind(&row.adjusted_tmb_comment)
            .push_bind(&row.kb_category);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("tmburMutationBurden"))
}

async fn insert_probe_results(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    gene_map: &HashMap<String, Uuid>,
    rows: &[ProbeResultInput],
) -> Result<Vec<Uuid>, CreateReportError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO probe_results (report_id, gene_id, variant, sample, comments) ",
    );
    qb.push_values(rows, |mut b, row| {
        b.push_bind(report_id)
            .push_bind(resolve_gene(gene_map, &row.gene))
            .push_bind(&row.variant)
            .push_bind(&row.sample)
            .push_bind(&row.comments);
    });
    qb.push(" RETURNING id");

    qb.build_query_scalar()
        .fetch_all(&mut **tx)
        .await
        .map_err(section_error("probeResults"))
}

/// Write every variant section present in the upload and collect the
/// key-to-id maps the knowledge-base linker needs.
///
/// The gene dictionary must be complete before this runs; gene foreign keys
/// are resolved from the in-memory map, never by re-reading the database.
pub async fn create_variant_sections(
    tx: &mut Transaction<'_, Postgres>,
    report_id: Uuid,
    gene_map: &HashMap<String, Uuid>,
    content: &ReportUpload,
) -> Result<VariantKeyMaps, CreateReportError> {
    let mut maps = VariantKeyMaps::new();

    if content.structural_variants.is_some() {
        let rows = section_rows(&content.structural_variants);
        check_unique_keys("structuralVariants", rows.iter().map(|r| r.key.as_deref()))?;
        let ids = insert_structural_variants(tx, report_id, gene_map, rows).await?;
        maps.insert(VariantType::Sv, key_map(rows.iter().map(|r| r.key.as_ref()), &ids));
    }

    if content.copy_variants.is_some() {
        let rows = section_rows(&content.copy_variants);
        check_unique_keys("copyVariants", rows.iter().map(|r| r.key.as_deref()))?;
        let ids = insert_copy_variants(tx, report_id, gene_map, rows).await?;
        maps.insert(VariantType::Cnv, key_map(rows.iter().map(|r| r.key.as_ref()), &ids));
    }

    if content.expression_variants.is_some() {
        let rows = section_rows(&content.expression_variants);
        check_unique_keys("expressionVariants", rows.iter().map(|r| r.key.as_deref()))?;
        let ids = insert_expression_variants(tx, report_id, gene_map, rows).await?;
        maps.insert(VariantType::Exp, key_map(rows.iter().map(|r| r.key.as_ref()), &ids));
    }

    if content.small_mutations.is_some() {
        let rows = section_rows(&content.small_mutations);
        check_unique_keys("smallMutations", rows.iter().map(|r| r.key.as_deref()))?;
        let ids = insert_small_mutations(tx, report_id, gene_map, rows).await?;
        maps.insert(VariantType::Mut, key_map(rows.iter().map(|r| r.key.as_ref()), &ids));
    }

    if content.protein_variants.is_some() {
        let rows = section_rows(&content.protein_variants);
        check_unique_keys("proteinVariants", rows.iter().map(|r| r.key.as_deref()))?;
        let ids = insert_protein_variants(tx, report_id, gene_map, rows).await?;
        maps.insert(VariantType::Protein, key_map(rows.iter().map(|r| r.key.as_ref()), &ids));
    }

    if content.signature_variants.is_some() {
        let rows = section_rows(&content.signature_variants);
        check_unique_keys("signatureVariants", rows.iter().map(|r| r.key.as_deref()))?;
        let ids = insert_signature_variants(tx, report_id, rows).await?;
        maps.insert(VariantType::Sigv, key_map(rows.iter().map(|r| r.key.as_ref()), &ids));
    }

    if content.msi.is_some() {
        let rows = section_rows(&content.msi);
        check_unique_keys("msi", rows.iter().map(|r| r.key.as_deref()))?;
        let ids = insert_msi(tx, report_id, rows).await?;
        maps.insert(VariantType::Msi, key_map(rows.iter().map(|r| r.key.as_ref()), &ids));
    }

    if content.tmbur_mutation_burden.is_some() {
        let rows = section_rows(&content.tmbur_mutation_burden);
        check_unique_keys("tmburMutationBurden", rows.iter().map(|r| r.key.as_deref()))?;
        let ids = insert_tmb(tx, report_id, rows).await?;
        maps.insert(VariantType::Tmb, key_map(rows.iter().map(|r| r.key.as_ref()), &ids));
    }

    // Probe results follow the same key/gene conventions but are never the
    // target of a knowledge-base match, so no map entry is kept.
    if content.probe_results.is_some() {
        let rows = section_rows(&content.probe_results);
        check_unique_keys("probeResults", rows.iter().map(|r| r.key.as_deref()))?;
        insert_probe_results(tx, report_id, gene_map, rows).await?;
    }

    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_keys_accepts_distinct_and_absent() {
        let keys = [Some("v1"), None, Some("v2"), None];
        assert!(check_unique_keys("copyVariants", keys.into_iter()).is_ok());
    }

    #[test]
    fn test_duplicate_key_names_offender() {
        let keys = [Some("v1"), Some("v2"), Some("v1")];
        let err = check_unique_keys("copyVariants", keys.into_iter()).unwrap_err();
        match err {
            CreateReportError::DuplicateVariantKey { section, key } => {
                assert_eq!(section, "copyVariants");
                assert_eq!(key, "v1");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_key_map_is_positional_and_skips_unkeyed_rows() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let keys = [Some("a".to_string()), None, Some("c".to_string())];
        let map = key_map(keys.iter().map(|k| k.as_ref()), &ids);

        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], ids[0]);
        assert_eq!(map["c"], ids[2]);
    }

    #[test]
    fn test_unresolved_gene_symbol_yields_no_fk() {
        let mut gene_map = HashMap::new();
        gene_map.insert("EGFR".to_string(), Uuid::new_v4());

        assert!(resolve_gene(&gene_map, &Some("UNKNOWN".to_string())).is_none());
        assert!(resolve_gene(&gene_map, &None).is_none());
        assert_eq!(
            resolve_gene(&gene_map, &Some("EGFR".to_string())),
            Some(gene_map["EGFR"])
        );
    }
}
