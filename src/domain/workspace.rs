use crate::config::{WorkflowPreferences, WorkspacePolicyDefaults};
use serde::{Deserialize, Serialize};

/// The tenant boundary. Every repository query filters on `id` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    /// Opaque handle into the external credential service (§1: per-system
    /// auth is out of scope — the core only ever holds a reference).
    pub credentials_handle: String,
    pub high_confidence_threshold: f64,
    pub medium_confidence_threshold: f64,
    /// Floor below which a classified candidate is not worth routing at all
    /// (§6.4 `skipLowValuePatches`), distinct from the medium/high bands
    /// used for routing priority.
    pub materiality_threshold: f64,
    pub ownership_source_ranking: Vec<String>,
    pub workflow_preferences: WorkflowPreferences,
    pub default_owner_ref: Option<String>,
}

impl Workspace {
    pub fn new(id: impl Into<String>, name: impl Into<String>, credentials_handle: impl Into<String>) -> Self {
        let defaults = WorkspacePolicyDefaults::default();
        Self {
            id: id.into(),
            name: name.into(),
            credentials_handle: credentials_handle.into(),
            high_confidence_threshold: defaults.high_confidence_threshold,
            medium_confidence_threshold: defaults.medium_confidence_threshold,
            materiality_threshold: defaults.materiality_threshold,
            ownership_source_ranking: defaults.ownership_source_ranking,
            workflow_preferences: WorkflowPreferences::default(),
            default_owner_ref: None,
        }
    }

    pub fn confidence_band(&self, confidence: f64) -> ConfidenceBand {
        if confidence >= self.high_confidence_threshold {
            ConfidenceBand::High
        } else if confidence >= self.medium_confidence_threshold {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_band_uses_workspace_thresholds() {
        let ws = Workspace::new("acme", "Acme", "cred-handle-1");
        assert_eq!(ws.confidence_band(0.95), ConfidenceBand::High);
        assert_eq!(ws.confidence_band(0.60), ConfidenceBand::Medium);
        assert_eq!(ws.confidence_band(0.10), ConfidenceBand::Low);
    }
}
