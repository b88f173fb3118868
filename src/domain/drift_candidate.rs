use super::signal_event::SourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// States of the durable FSM (§4.1). Ordering here matches the pipeline's
/// dependency order; `StateMachine::next_states` in the state_machine
/// module is the single source of truth for legal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftState {
    Ingested,
    Normalized,
    EligibilityChecked,
    EvidenceBuilt,
    DocsResolved,
    Compared,
    Classified,
    PolicyEvaluated,
    Routed,
    PatchPlanned,
    PatchProposed,
    AwaitingHuman,
    Applied,
    Rejected,
    Snoozed,
    Ignored,
    Failed,
    FailedNeedsMapping,
    FailedPatchGeneration,
}

impl DriftState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DriftState::Applied
                | DriftState::Rejected
                | DriftState::Ignored
                | DriftState::Failed
                | DriftState::FailedNeedsMapping
                | DriftState::FailedPatchGeneration
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DriftState::Ingested => "INGESTED",
            DriftState::Normalized => "NORMALIZED",
            DriftState::EligibilityChecked => "ELIGIBILITY_CHECKED",
            DriftState::EvidenceBuilt => "EVIDENCE_BUILT",
            DriftState::DocsResolved => "DOCS_RESOLVED",
            DriftState::Compared => "COMPARED",
            DriftState::Classified => "CLASSIFIED",
            DriftState::PolicyEvaluated => "POLICY_EVALUATED",
            DriftState::Routed => "ROUTED",
            DriftState::PatchPlanned => "PATCH_PLANNED",
            DriftState::PatchProposed => "PATCH_PROPOSED",
            DriftState::AwaitingHuman => "AWAITING_HUMAN",
            DriftState::Applied => "APPLIED",
            DriftState::Rejected => "REJECTED",
            DriftState::Snoozed => "SNOOZED",
            DriftState::Ignored => "IGNORED",
            DriftState::Failed => "FAILED",
            DriftState::FailedNeedsMapping => "FAILED_NEEDS_MAPPING",
            DriftState::FailedPatchGeneration => "FAILED_PATCH_GENERATION",
        }
    }
}

impl std::fmt::Display for DriftState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftType {
    Instruction,
    Process,
    Ownership,
    Environment,
    Coverage,
}

impl DriftType {
    /// Tie-break priority per §4.3: `ownership > instruction > environment >
    /// process`. Lower number wins.
    pub fn priority_rank(self) -> u8 {
        match self {
            DriftType::Ownership => 0,
            DriftType::Instruction => 1,
            DriftType::Environment => 2,
            DriftType::Process => 3,
            DriftType::Coverage => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    Deterministic,
    Llm,
    Hybrid,
}

/// The unit of work advancing through the FSM (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftCandidate {
    pub workspace_id: String,
    pub id: String,
    pub signal_event_id: String,
    pub state: DriftState,
    pub state_updated_at: DateTime<Utc>,
    pub source_type: SourceType,
    pub service: Option<String>,
    pub repo: Option<String>,
    pub drift_type: Option<DriftType>,
    pub classification_method: Option<ClassificationMethod>,
    pub confidence: Option<f64>,
    pub comparison_result: Option<serde_json::Value>,
    pub evidence_bundle_id: Option<String>,
    pub doc_candidates: Option<Vec<String>>,
    pub docs_resolution_status: Option<String>,
    pub docs_resolution_confidence: Option<f64>,
    pub owner_resolution: Option<String>,
    pub routing_decision: Option<String>,
    pub active_plan_id: Option<String>,
    pub active_plan_version: Option<String>,
    /// Frozen at policy-resolution time so later pack edits never mutate an
    /// in-flight decision (§3 invariant).
    pub active_plan_hash: Option<String>,
    pub correlated_signals: Option<Vec<String>>,
    pub fingerprint_strict: String,
    pub fingerprint_medium: String,
    pub fingerprint_broad: String,
    pub retry_count: u32,
    pub last_error_code: Option<String>,
    pub last_error_message: Option<String>,
    pub trace_id: String,
}

impl DriftCandidate {
    /// `hasCoverageGap` is never stored as a denormalized column (§9 open
    /// question, resolved): always re-derive it from `comparisonResult`.
    pub fn has_coverage_gap(&self) -> bool {
        self.comparison_result
            .as_ref()
            .and_then(|v| v.get("has_coverage_gap"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_exactly_the_documented_set() {
        let terminal: Vec<DriftState> = [
            DriftState::Ingested,
            DriftState::Normalized,
            DriftState::EligibilityChecked,
            DriftState::EvidenceBuilt,
            DriftState::DocsResolved,
            DriftState::Compared,
            DriftState::Classified,
            DriftState::PolicyEvaluated,
            DriftState::Routed,
            DriftState::PatchPlanned,
            DriftState::PatchProposed,
            DriftState::AwaitingHuman,
            DriftState::Applied,
            DriftState::Rejected,
            DriftState::Snoozed,
            DriftState::Ignored,
            DriftState::Failed,
            DriftState::FailedNeedsMapping,
            DriftState::FailedPatchGeneration,
        ]
        .into_iter()
        .filter(|s| s.is_terminal())
        .collect();

        assert_eq!(terminal.len(), 6);
        assert!(terminal.contains(&DriftState::Applied));
        assert!(terminal.contains(&DriftState::Rejected));
        assert!(terminal.contains(&DriftState::Ignored));
        assert!(terminal.contains(&DriftState::Failed));
        assert!(terminal.contains(&DriftState::FailedNeedsMapping));
        assert!(terminal.contains(&DriftState::FailedPatchGeneration));
        assert!(!terminal.contains(&DriftState::Snoozed));
    }

    #[test]
    fn drift_type_priority_matches_tie_break_order() {
        let mut types = vec![
            DriftType::Process,
            DriftType::Environment,
            DriftType::Ownership,
            DriftType::Instruction,
        ];
        types.sort_by_key(|t| t.priority_rank());
        assert_eq!(
            types,
            vec![
                DriftType::Ownership,
                DriftType::Instruction,
                DriftType::Environment,
                DriftType::Process,
            ]
        );
    }
}
