use crate::evidence::BaselineArtifacts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactBand {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactAssessment {
    pub impact_score: f64,
    pub impact_band: ImpactBand,
    pub fired_rules: Vec<String>,
    pub blast_radius: Option<String>,
}

impl ImpactAssessment {
    pub fn band_for_score(score: f64) -> ImpactBand {
        if score >= 0.85 {
            ImpactBand::Critical
        } else if score >= 0.6 {
            ImpactBand::High
        } else if score >= 0.3 {
            ImpactBand::Medium
        } else {
            ImpactBand::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprints {
    pub strict: String,
    pub medium: String,
    pub broad: String,
}

/// Immutable, content-addressed record of the structured inputs used to
/// reach a classification (§3). Never mutated; re-evaluation produces a new
/// bundle with a `schemaVersion` >= the previous one (§8 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub bundle_id: String,
    pub workspace_id: String,
    pub drift_candidate_id: String,
    pub source_evidence: BaselineArtifacts,
    pub target_evidence: BaselineArtifacts,
    pub assessment: ImpactAssessment,
    pub fingerprints: Fingerprints,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
}

pub const CURRENT_EVIDENCE_SCHEMA_VERSION: u32 = 1;
