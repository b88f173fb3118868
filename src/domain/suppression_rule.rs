use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintLevel {
    Strict,
    Medium,
    Broad,
}

impl FingerprintLevel {
    /// The coarser level this escalates to after enough false positives
    /// (§4.6). `Broad` has nowhere further to escalate.
    pub fn escalate(self) -> Option<FingerprintLevel> {
        match self {
            FingerprintLevel::Strict => Some(FingerprintLevel::Medium),
            FingerprintLevel::Medium => Some(FingerprintLevel::Broad),
            FingerprintLevel::Broad => None,
        }
    }

    /// False-positive count required before escalating away from this level.
    pub fn escalation_threshold(self) -> u32 {
        match self {
            FingerprintLevel::Strict => 3,
            FingerprintLevel::Medium => 5,
            FingerprintLevel::Broad => u32::MAX,
        }
    }

    pub fn match_confidence(self) -> f64 {
        match self {
            FingerprintLevel::Strict => 0.95,
            FingerprintLevel::Medium => 0.8,
            FingerprintLevel::Broad => 0.6,
        }
    }
}

/// A learned suppression, created after a human rejects enough recurring
/// false positives at a given fingerprint level (§3, §8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub workspace_id: String,
    pub fingerprint: String,
    pub level: FingerprintLevel,
    pub reason: String,
    pub created_by: String,
    pub expires_at: Option<DateTime<Utc>>,
}
