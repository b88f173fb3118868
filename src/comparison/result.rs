use crate::domain::drift_candidate::DriftType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ReplaceSteps,
    AddSection,
    UpdateOwnership,
    AddNote,
}

/// Output of the comparison engine (§4.3): a drift finding plus the
/// orthogonal coverage-gap signal, both derived fresh from the source and
/// target evidence on every read rather than denormalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub drift_type: Option<DriftType>,
    pub confidence: f64,
    pub has_drift: bool,
    pub has_coverage_gap: bool,
    pub all_drift_types: Vec<DriftType>,
    pub conflicts: Vec<String>,
    pub new_content: Vec<String>,
    pub coverage_gaps: Vec<String>,
    pub recommendation: Option<Recommendation>,
}
