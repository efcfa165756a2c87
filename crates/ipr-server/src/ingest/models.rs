//! Upload payload model for report ingestion
//!
//! The upload carries no database identities: genes are referenced by symbol
//! and variants by a client-supplied transient `key` that is only meaningful
//! within one section of one upload. The ingestion pipeline resolves both
//! into real row ids while it builds the report.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A section value that legacy loaders may supply either as a single object
/// or as an array. Both shapes are treated as an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }
}

/// View an optional section as a slice, treating an absent section as empty.
pub fn section_rows<T>(section: &Option<OneOrMany<T>>) -> &[T] {
    section.as_ref().map(OneOrMany::as_slice).unwrap_or(&[])
}

/// The closed set of knowledge-base matchable variant types.
///
/// Each tag names the section its observed variants are uploaded under and
/// the table they are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    /// Copy-number variants
    Cnv,
    /// Small (somatic) mutations
    Mut,
    /// Structural variants
    Sv,
    /// Expression outliers
    Exp,
    /// Protein expression variants
    Protein,
    /// Microsatellite instability
    Msi,
    /// Tumour mutation burden
    Tmb,
    /// Mutation signatures
    Sigv,
}

impl VariantType {
    pub const ALL: [VariantType; 8] = [
        VariantType::Cnv,
        VariantType::Mut,
        VariantType::Sv,
        VariantType::Exp,
        VariantType::Protein,
        VariantType::Msi,
        VariantType::Tmb,
        VariantType::Sigv,
    ];

    /// The wire tag, also the value stored in `kb_matches.variant_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            VariantType::Cnv => "cnv",
            VariantType::Mut => "mut",
            VariantType::Sv => "sv",
            VariantType::Exp => "exp",
            VariantType::Protein => "protein",
            VariantType::Msi => "msi",
            VariantType::Tmb => "tmb",
            VariantType::Sigv => "sigv",
        }
    }

    /// Upload section name for this variant type, used in error context.
    pub fn section_name(self) -> &'static str {
        match self {
            VariantType::Cnv => "copyVariants",
            VariantType::Mut => "smallMutations",
            VariantType::Sv => "structuralVariants",
            VariantType::Exp => "expressionVariants",
            VariantType::Protein => "proteinVariants",
            VariantType::Msi => "msi",
            VariantType::Tmb => "tmburMutationBurden",
            VariantType::Sigv => "signatureVariants",
        }
    }
}

impl std::fmt::Display for VariantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full report upload payload.
///
/// `template` and `project` are resolved by name before anything is written;
/// every other field becomes report-owned rows inside one transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportUpload {
    pub template: String,
    pub project: String,
    #[serde(default)]
    pub additional_projects: Vec<String>,

    pub patient_id: String,
    #[serde(default)]
    pub biopsy_name: Option<String>,
    #[serde(default)]
    pub created_by_id: Option<Uuid>,

    /// Explicit gene annotations; merged over the symbols collected from the
    /// variant sections.
    #[serde(default)]
    pub genes: Vec<GeneInput>,

    // Variant family
    #[serde(default)]
    pub structural_variants: Option<OneOrMany<StructuralVariantInput>>,
    #[serde(default)]
    pub copy_variants: Option<OneOrMany<CopyVariantInput>>,
    #[serde(default)]
    pub expression_variants: Option<OneOrMany<ExpressionVariantInput>>,
    #[serde(default)]
    pub small_mutations: Option<OneOrMany<SmallMutationInput>>,
    #[serde(default)]
    pub protein_variants: Option<OneOrMany<ProteinVariantInput>>,
    #[serde(default)]
    pub signature_variants: Option<OneOrMany<SignatureVariantInput>>,
    #[serde(default)]
    pub msi: Option<OneOrMany<MsiInput>>,
    #[serde(default)]
    pub tmbur_mutation_burden: Option<OneOrMany<TmbInput>>,
    #[serde(default)]
    pub probe_results: Option<OneOrMany<ProbeResultInput>>,

    // Knowledge-base match graph
    #[serde(default)]
    pub kb_matches: Vec<KbMatchInput>,

    // Images
    #[serde(default)]
    pub images: Vec<ImageInput>,

    // Generic sections
    #[serde(default)]
    pub patient_information: Option<PatientInformationInput>,
    #[serde(default)]
    pub sample_info: Option<OneOrMany<SampleInfoInput>>,
    #[serde(default)]
    pub analyst_comments: Option<AnalystCommentsInput>,
    #[serde(default)]
    pub therapeutic_targets: Option<OneOrMany<TherapeuticTargetInput>>,
    #[serde(default)]
    pub mutation_burden: Option<OneOrMany<MutationBurdenInput>>,
    #[serde(default)]
    pub comparators: Option<OneOrMany<ComparatorInput>>,
    #[serde(default)]
    pub microbial: Option<OneOrMany<MicrobialInput>>,
    #[serde(default)]
    pub hla_types: Option<OneOrMany<HlaTypeInput>>,
    #[serde(default)]
    pub immune_cell_types: Option<OneOrMany<ImmuneCellTypeInput>>,
    #[serde(default)]
    pub genomic_alterations_identified: Option<OneOrMany<GenomicAlterationInput>>,
}

/// Explicit gene dictionary entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneInput {
    pub name: String,
    #[serde(default)]
    pub oncogene: bool,
    #[serde(default)]
    pub tumour_suppressor: bool,
    #[serde(default)]
    pub drug_targetable: bool,
    #[serde(default)]
    pub known_fusion_partner: bool,
    #[serde(default)]
    pub therapeutic_associated: bool,
}

impl GeneInput {
    /// Bare entry for a symbol collected from a variant section.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            oncogene: false,
            tumour_suppressor: false,
            drug_targetable: false,
            known_fusion_partner: false,
            therapeutic_associated: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralVariantInput {
    #[serde(default)]
    pub key: Option<String>,
    /// Breakpoint partner gene symbols; either may be absent (intergenic).
    #[serde(default)]
    pub gene1: Option<String>,
    #[serde(default)]
    pub gene2: Option<String>,
    #[serde(default)]
    pub exon1: Option<String>,
    #[serde(default)]
    pub exon2: Option<String>,
    #[serde(default)]
    pub breakpoint: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub detected_in: Option<String>,
    #[serde(default)]
    pub conventional_name: Option<String>,
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub omic_support: bool,
    #[serde(default)]
    pub svg_title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyVariantInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub copy_change: Option<i32>,
    #[serde(default)]
    pub loh_state: Option<String>,
    #[serde(default)]
    pub cnv_state: Option<String>,
    #[serde(default)]
    pub chromosome_band: Option<String>,
    #[serde(default)]
    pub start_position: Option<i64>,
    #[serde(default)]
    pub end_position: Option<i64>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub kb_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionVariantInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub rpkm: Option<f64>,
    #[serde(default)]
    pub tpm: Option<f64>,
    #[serde(default)]
    pub expression_state: Option<String>,
    #[serde(default)]
    pub primary_site_fold_change: Option<f64>,
    #[serde(default)]
    pub kb_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmallMutationInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub protein_change: Option<String>,
    #[serde(default)]
    pub chromosome: Option<String>,
    #[serde(default)]
    pub start_position: Option<i64>,
    #[serde(default)]
    pub end_position: Option<i64>,
    #[serde(default)]
    pub ref_seq: Option<String>,
    #[serde(default)]
    pub alt_seq: Option<String>,
    #[serde(default)]
    pub zygosity: Option<String>,
    #[serde(default)]
    pub hgvs_protein: Option<String>,
    #[serde(default)]
    pub hgvs_cds: Option<String>,
    #[serde(default)]
    pub hgvs_genomic: Option<String>,
    #[serde(default)]
    pub germline: bool,
    #[serde(default)]
    pub tumour_alt_count: Option<i32>,
    #[serde(default)]
    pub tumour_ref_count: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinVariantInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub percentile: Option<f64>,
    #[serde(default)]
    pub kiqr: Option<f64>,
    #[serde(default)]
    pub comparator: Option<String>,
    #[serde(default)]
    pub total_sample_observed: Option<i32>,
    #[serde(default)]
    pub secondary_percentile: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureVariantInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub signature_name: Option<String>,
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub kb_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsiInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub kb_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmbInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub genome_snvs: Option<i32>,
    #[serde(default)]
    pub genome_indels: Option<i32>,
    #[serde(default, rename = "nonNBasesIn1To22AndXAndY")]
    pub non_n_bases: Option<String>,
    #[serde(default)]
    pub adjusted_tmb: Option<f64>,
    #[serde(default)]
    pub adjusted_tmb_comment: Option<String>,
    #[serde(default)]
    pub kb_category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResultInput {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub sample: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

/// One knowledge-base match entry. The identity fields name the observed
/// variant (by section type and upload key) and the matched knowledge-base
/// variant; everything else is statement content, de-duplicated per report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbMatchInput {
    pub variant_type: VariantType,
    /// Upload `key` of the observed variant this match attaches to.
    pub variant: String,
    #[serde(default)]
    pub kb_variant: Option<String>,
    #[serde(default)]
    pub kb_variant_id: Option<String>,
    #[serde(flatten)]
    pub statement: KbStatementContent,
}

/// Statement-content portion of a knowledge-base match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KbStatementContent {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub approved_therapy: Option<String>,
    #[serde(default)]
    pub disease: Option<String>,
    #[serde(default)]
    pub relevance: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub evidence_level: Option<String>,
    #[serde(default)]
    pub matched_cancer: Option<bool>,
    #[serde(default)]
    pub kb_statement_id: Option<String>,
}

impl KbStatementContent {
    /// True when the match carried no statement fields at all; such matches
    /// are created without a statement or join row.
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.approved_therapy.is_none()
            && self.disease.is_none()
            && self.relevance.is_none()
            && self.context.is_none()
            && self.status.is_none()
            && self.reference.is_none()
            && self.evidence_level.is_none()
            && self.matched_cancer.is_none()
            && self.kb_statement_id.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    /// Path to the image file, accessible to the server process.
    pub path: String,
    pub key: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientInformationInput {
    #[serde(default)]
    pub physician: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub biopsy_site: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleInfoInput {
    #[serde(default)]
    pub sample: Option<String>,
    #[serde(default)]
    pub sample_name: Option<String>,
    #[serde(default)]
    pub biopsy_site: Option<String>,
    #[serde(default)]
    pub biopsy_type: Option<String>,
    #[serde(default)]
    pub primary_site: Option<String>,
    #[serde(default)]
    pub patho_tc: Option<String>,
    #[serde(default)]
    pub collection_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystCommentsInput {
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapeuticTargetInput {
    #[serde(rename = "type", default = "TherapeuticTargetInput::default_type")]
    pub target_type: String,
    #[serde(default)]
    pub gene: Option<String>,
    #[serde(default)]
    pub gene_graphkb_id: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub variant_graphkb_id: Option<String>,
    #[serde(default)]
    pub therapy: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub evidence_level: Option<String>,
}

impl TherapeuticTargetInput {
    fn default_type() -> String {
        "therapeutic".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationBurdenInput {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub coding_snv_count: Option<i32>,
    #[serde(default)]
    pub coding_indel_count: Option<i32>,
    #[serde(default)]
    pub quality_sv_count: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparatorInput {
    pub analysis_role: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrobialInput {
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub integration_site: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HlaTypeInput {
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default)]
    pub pathology: Option<String>,
    #[serde(default)]
    pub a1: Option<String>,
    #[serde(default)]
    pub a2: Option<String>,
    #[serde(default)]
    pub b1: Option<String>,
    #[serde(default)]
    pub b2: Option<String>,
    #[serde(default)]
    pub c1: Option<String>,
    #[serde(default)]
    pub c2: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImmuneCellTypeInput {
    #[serde(default)]
    pub cell_type: Option<String>,
    #[serde(default)]
    pub kb_category: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub percentile: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenomicAlterationInput {
    pub gene_variant: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_or_many_accepts_single_object() {
        let parsed: OneOrMany<MsiInput> = serde_json::from_str(r#"{"score": 12.5}"#).unwrap();
        let rows = parsed.as_slice();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, Some(12.5));
    }

    #[test]
    fn test_one_or_many_accepts_array() {
        let parsed: OneOrMany<MsiInput> =
            serde_json::from_str(r#"[{"score": 1.0}, {"score": 2.0}]"#).unwrap();
        assert_eq!(parsed.as_slice().len(), 2);
    }

    #[test]
    fn test_section_rows_absent_is_empty() {
        let section: Option<OneOrMany<MsiInput>> = None;
        assert!(section_rows(&section).is_empty());
    }

    #[test]
    fn test_variant_type_serde_tags() {
        for variant_type in VariantType::ALL {
            let tag = serde_json::to_value(variant_type).unwrap();
            assert_eq!(tag, serde_json::json!(variant_type.as_str()));
            let back: VariantType = serde_json::from_value(tag).unwrap();
            assert_eq!(back, variant_type);
        }
    }

    #[test]
    fn test_unknown_variant_type_rejected() {
        let result: Result<VariantType, _> = serde_json::from_str(r#""bogus""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_kb_match_splits_statement_content() {
        let parsed: KbMatchInput = serde_json::from_str(
            r#"{
                "variantType": "exp",
                "variant": "e1",
                "kbVariant": "EGFR increased expression",
                "category": "therapeutic",
                "relevance": "sensitivity"
            }"#,
        )
        .unwrap();

        assert_eq!(parsed.variant_type, VariantType::Exp);
        assert_eq!(parsed.variant, "e1");
        assert_eq!(parsed.kb_variant.as_deref(), Some("EGFR increased expression"));
        assert_eq!(parsed.statement.category.as_deref(), Some("therapeutic"));
        assert_eq!(parsed.statement.relevance.as_deref(), Some("sensitivity"));
        assert!(!parsed.statement.is_empty());
    }

    #[test]
    fn test_statement_content_empty_when_identity_only() {
        let parsed: KbMatchInput = serde_json::from_str(
            r#"{"variantType": "sv", "variant": "sv1", "kbVariant": "fusion"}"#,
        )
        .unwrap();
        assert!(parsed.statement.is_empty());
    }

    #[test]
    fn test_upload_minimal_payload() {
        let upload: ReportUpload = serde_json::from_str(
            r#"{"template": "Genomic", "project": "ProjectX", "patientId": "PAT01"}"#,
        )
        .unwrap();
        assert_eq!(upload.template, "Genomic");
        assert!(upload.genes.is_empty());
        assert!(upload.kb_matches.is_empty());
        assert!(upload.structural_variants.is_none());
    }

    #[test]
    fn test_therapeutic_target_type_defaults() {
        let target: TherapeuticTargetInput =
            serde_json::from_str(r#"{"gene": "EGFR", "therapy": "erlotinib"}"#).unwrap();
        assert_eq!(target.target_type, "therapeutic");
    }
}
