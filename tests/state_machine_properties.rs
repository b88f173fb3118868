//! Property-based coverage of the FSM invariants.

use drift_agent::domain::DriftState;
use drift_agent::error::{AdapterError, DriftError, SchemaError};
use drift_agent::state_machine::{is_legal_transition, resolve, Resolution};
use drift_agent::resolve as resolve_reexport;
use proptest::prelude::*;

fn all_states() -> Vec<DriftState> {
    vec![
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
}

fn state_strategy() -> impl Strategy<Value = DriftState> {
    prop::sample::select(all_states())
}

proptest! {
    /// Monotone states (§8): no legal transition ever starts from a
    /// terminal state, regardless of which pair is sampled.
    #[test]
    fn terminal_states_never_have_an_outgoing_legal_transition(
        from in state_strategy(),
        to in state_strategy(),
    ) {
        if from.is_terminal() {
            prop_assert!(!is_legal_transition(from, to));
        }
    }

    /// `resolve` must never advance a candidate into a state that
    /// `is_legal_transition` rejects — the state machine's own resolver
    /// can't contradict the transition table it is built on.
    #[test]
    fn resolve_never_advances_to_an_illegal_state(
        from in state_strategy(),
        to in state_strategy(),
        retry_count in 0u32..6,
    ) {
        let resolution = resolve(from, retry_count, Ok(to));
        if let Resolution::Advance { next_state } = resolution {
            prop_assert!(is_legal_transition(from, next_state));
        }
    }

    /// Transient failures only ever retry or land on the single `FAILED`
    /// terminal state via `RETRY_EXHAUSTED`; they never escape into a
    /// state the transition table doesn't already call a failure edge.
    #[test]
    fn transient_failures_eventually_reach_a_terminal_state(
        from in state_strategy().prop_filter("non-terminal", |s| !s.is_terminal()),
        retry_count in 0u32..10,
    ) {
        let error = DriftError::Adapter(AdapterError::Network("timeout".to_string()));
        let resolution = resolve(from, retry_count, Err(error));
        match resolution {
            Resolution::RetryAfter { .. } => {}
            Resolution::Terminal { next_state, .. } => {
                prop_assert!(next_state.is_terminal());
                prop_assert!(is_legal_transition(from, next_state));
            }
            Resolution::Advance { .. } => prop_assert!(false, "a failure can't advance"),
        }
    }

    /// Permanent (schema) failures are always immediately terminal, never
    /// retried, regardless of how many retries were already recorded.
    #[test]
    fn permanent_failures_are_never_retried(
        from in state_strategy().prop_filter("non-terminal", |s| !s.is_terminal()),
        retry_count in 0u32..10,
    ) {
        let error = DriftError::Schema(SchemaError::MissingRequiredField {
            source_type: "github_pr".to_string(),
            field: "diff".to_string(),
        });
        let resolution = resolve(from, retry_count, Err(error));
        prop_assert!(matches!(resolution, Resolution::Terminal { .. }));
    }
}

/// The crate-root re-export (`drift_agent::resolve`) is the same function,
/// not a stale copy left over from refactoring `lib.rs`.
#[test]
fn crate_root_reexport_matches_the_module_function() {
    let direct = resolve(DriftState::Ingested, 0, Ok(DriftState::Normalized));
    let reexported = resolve_reexport(DriftState::Ingested, 0, Ok(DriftState::Normalized));
    assert_eq!(direct, reexported);
}
