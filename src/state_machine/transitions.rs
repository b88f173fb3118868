use crate::domain::drift_candidate::DriftState;

/// The main-sequence edges of the pipeline (§4.1), in dependency order.
/// `SNOOZED -> AWAITING_HUMAN` is the one re-entrant edge: a snooze is a
/// timed suspension, not a terminal outcome.
const SEQUENCE: &[(DriftState, DriftState)] = &[
    (DriftState::Ingested, DriftState::Normalized),
    (DriftState::Normalized, DriftState::EligibilityChecked),
    (DriftState::EligibilityChecked, DriftState::EvidenceBuilt),
    (DriftState::EvidenceBuilt, DriftState::DocsResolved),
    (DriftState::DocsResolved, DriftState::Compared),
    (DriftState::Compared, DriftState::Classified),
    (DriftState::Classified, DriftState::PolicyEvaluated),
    (DriftState::PolicyEvaluated, DriftState::Routed),
    (DriftState::Routed, DriftState::PatchPlanned),
    (DriftState::PatchPlanned, DriftState::PatchProposed),
    (DriftState::PatchProposed, DriftState::AwaitingHuman),
    (DriftState::AwaitingHuman, DriftState::Applied),
    (DriftState::AwaitingHuman, DriftState::Rejected),
    (DriftState::AwaitingHuman, DriftState::Snoozed),
    (DriftState::AwaitingHuman, DriftState::Ignored),
    (DriftState::Snoozed, DriftState::AwaitingHuman),
];

/// Non-terminal states that can short-circuit straight to `IGNORED` when a
/// stage finds the candidate non-applicable (eligibility filter, learned
/// suppression, confidence below the ignore threshold).
const IGNORABLE_FROM: &[DriftState] = &[
    DriftState::EligibilityChecked,
    DriftState::Classified,
    DriftState::PolicyEvaluated,
];

/// True if advancing from `from` to `to` is a legal transition: either the
/// documented main-sequence edge, a universal failure edge from any
/// non-terminal state, or an `IGNORED` short-circuit from an eligible stage.
pub fn is_legal_transition(from: DriftState, to: DriftState) -> bool {
    if from.is_terminal() {
        return false;
    }
    if SEQUENCE.contains(&(from, to)) {
        return true;
    }
    if matches!(
        to,
        DriftState::Failed | DriftState::FailedNeedsMapping | DriftState::FailedPatchGeneration
    ) {
        return true;
    }
    if to == DriftState::Ignored && IGNORABLE_FROM.contains(&from) {
        return true;
    }
    false
}

/// Which terminal failure variant a stage failure maps to (§4.1). Only
/// `DocsResolved` (ambiguous or unresolved doc mapping) and the patch
/// stages get their own specific code; everything else falls back to the
/// generic `FAILED`.
pub fn terminal_failure_state(failing_state: DriftState) -> DriftState {
    match failing_state {
        DriftState::DocsResolved => DriftState::FailedNeedsMapping,
        DriftState::PatchPlanned | DriftState::PatchProposed => {
            DriftState::FailedPatchGeneration
        }
        _ => DriftState::Failed,
    }
}
