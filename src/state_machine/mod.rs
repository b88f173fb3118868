pub mod retry;
pub mod transitions;

use crate::domain::drift_candidate::DriftState;
use crate::error::{DriftError, ErrorCode, FailureClass};
use std::time::Duration;

pub use transitions::{is_legal_transition, terminal_failure_state};

/// What a stage handler asks the machine to do after it runs. Handlers
/// return `Ok(next_state)` to advance normally; failures and non-applicable
/// outcomes are communicated through `DriftError`, not this type.
pub type StageResult = Result<DriftState, DriftError>;

/// What the machine decided to actually do with a stage's `StageResult`
/// (§4.1): advance, back off and retry the same stage, or dead-letter into
/// a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Advance {
        next_state: DriftState,
    },
    RetryAfter {
        delay: Duration,
        retry_count: u32,
    },
    Terminal {
        next_state: DriftState,
        error_code: ErrorCode,
        error_message: String,
    },
}

/// Classifies a stage's outcome and decides the next action (§4.1, §7).
/// `current_state` is the state the candidate was in when the handler ran;
/// `retry_count` is the count already recorded on the candidate.
pub fn resolve(
    current_state: DriftState,
    retry_count: u32,
    result: StageResult,
) -> Resolution {
    let error = match result {
        Ok(next_state) => {
            debug_assert!(
                is_legal_transition(current_state, next_state),
                "illegal transition {current_state} -> {next_state}"
            );
            return Resolution::Advance { next_state };
        }
        Err(error) => error,
    };

    match error.failure_class() {
        FailureClass::NonApplicable => Resolution::Terminal {
            next_state: DriftState::Ignored,
            error_code: error.code(),
            error_message: error.to_string(),
        },
        FailureClass::Permanent => Resolution::Terminal {
            next_state: terminal_failure_state(current_state),
            error_code: error.code(),
            error_message: error.to_string(),
        },
        FailureClass::Transient => {
            if retry::retries_exhausted(retry_count) {
                Resolution::Terminal {
                    next_state: DriftState::Failed,
                    error_code: ErrorCode::RetryExhausted,
                    error_message: format!(
                        "retries exhausted after {retry_count} attempts: {error}"
                    ),
                }
            } else {
                Resolution::RetryAfter {
                    delay: retry::backoff_delay(retry_count),
                    retry_count: retry_count + 1,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AdapterError, SchemaError};

    #[test]
    fn a_successful_stage_advances() {
        let resolution = resolve(
            DriftState::Ingested,
            0,
            Ok(DriftState::Normalized),
        );
        assert_eq!(
            resolution,
            Resolution::Advance {
                next_state: DriftState::Normalized
            }
        );
    }

    #[test]
    fn a_permanent_error_fails_with_the_stage_specific_terminal_state() {
        let error = DriftError::Schema(SchemaError::MissingRequiredField {
            source_type: "github_pr".to_string(),
            field: "diff".to_string(),
        });
        let resolution = resolve(DriftState::Normalized, 0, Err(error));
        match resolution {
            Resolution::Terminal {
                next_state,
                error_code,
                ..
            } => {
                assert_eq!(next_state, DriftState::Failed);
                assert_eq!(error_code, ErrorCode::ExtractedSchemaViolation);
            }
            other => panic!("expected Terminal, got {other:?}"),
        }
    }

    #[test]
    fn a_transient_error_retries_with_backoff_until_exhausted() {
        let error = || DriftError::Adapter(AdapterError::Network("timeout".to_string()));
        let resolution = resolve(DriftState::DocsResolved, 0, Err(error()));
        assert!(matches!(resolution, Resolution::RetryAfter { retry_count: 1, .. }));

        let exhausted = resolve(DriftState::DocsResolved, retry::MAX_RETRIES, Err(error()));
        match exhausted {
            Resolution::Terminal {
                next_state,
                error_code,
                ..
            } => {
                assert_eq!(next_state, DriftState::Failed);
                assert_eq!(error_code, ErrorCode::RetryExhausted);
            }
            other => panic!("expected Terminal, got {other:?}"),
        }
    }

    #[test]
    fn a_permanent_adapter_error_during_docs_resolution_maps_to_needs_mapping() {
        let error = DriftError::Adapter(AdapterError::NotFound("README.md".to_string()));
        let resolution = resolve(DriftState::DocsResolved, 0, Err(error));
        match resolution {
            Resolution::Terminal { next_state, .. } => {
                assert_eq!(next_state, DriftState::FailedNeedsMapping)
            }
            other => panic!("expected Terminal, got {other:?}"),
        }
    }
}
