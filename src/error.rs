use thiserror::Error;

/// The taxonomy codes from the error-handling design. Stored verbatim on
/// `DriftCandidate.lastErrorCode` so the audit trail never has to re-derive
/// a code from a `Display` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ExtractedSchemaViolation,
    PolicyPackValidation,
    LlmSchemaValidation,
    AdapterAuth,
    AdapterNotFound,
    ConfluenceConflict,
    GithubRateLimit,
    PackMergeConflict,
    UnknownComparator,
    BudgetExceeded,
    ComparatorTimeout,
    RetryExhausted,
    NotApplicable,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ExtractedSchemaViolation => "EXTRACTED_SCHEMA_VIOLATION",
            ErrorCode::PolicyPackValidation => "POLICY_PACK_VALIDATION",
            ErrorCode::LlmSchemaValidation => "LLM_SCHEMA_VALIDATION",
            ErrorCode::AdapterAuth => "ADAPTER_AUTH",
            ErrorCode::AdapterNotFound => "ADAPTER_NOT_FOUND",
            ErrorCode::ConfluenceConflict => "CONFLUENCE_CONFLICT",
            ErrorCode::GithubRateLimit => "GITHUB_RATE_LIMIT",
            ErrorCode::PackMergeConflict => "PACK_MERGE_CONFLICT",
            ErrorCode::UnknownComparator => "UNKNOWN_COMPARATOR",
            ErrorCode::BudgetExceeded => "BUDGET_EXCEEDED",
            ErrorCode::ComparatorTimeout => "COMPARATOR_TIMEOUT",
            ErrorCode::RetryExhausted => "RETRY_EXHAUSTED",
            ErrorCode::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a stage failure should be handled by the state machine (§4.1, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Network error, rate limit, 5xx — back off and retry.
    Transient,
    /// Schema violation, missing field, unknown source — terminal immediately.
    Permanent,
    /// Eligibility filter, suppression, low confidence — terminal but not an error.
    NonApplicable,
}

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("schema violation: {0}")]
    Schema(#[from] SchemaError),

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("state machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    #[error("database error: {0}")]
    Database(String),

    /// A stage determined the candidate is not actionable — eligibility
    /// filter, suppression match, or confidence below the materiality
    /// floor (§4.1). Maps to `FailureClass::NonApplicable`, which
    /// `state_machine::resolve` turns into a terminal `Ignored`, not a
    /// retry or failure.
    #[error("not applicable: {0}")]
    NotApplicable(String),
}

impl DriftError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DriftError::Schema(e) => e.code(),
            DriftError::Adapter(e) => e.code(),
            DriftError::Policy(e) => e.code(),
            DriftError::Llm(e) => e.code(),
            DriftError::StateMachine(_) => ErrorCode::RetryExhausted,
            DriftError::Database(_) => ErrorCode::RetryExhausted,
            DriftError::NotApplicable(_) => ErrorCode::NotApplicable,
        }
    }

    pub fn failure_class(&self) -> FailureClass {
        match self {
            DriftError::Schema(_) => FailureClass::Permanent,
            DriftError::Adapter(e) => e.failure_class(),
            DriftError::Policy(_) => FailureClass::Permanent,
            DriftError::Llm(e) => e.failure_class(),
            DriftError::StateMachine(_) => FailureClass::Transient,
            DriftError::Database(_) => FailureClass::Transient,
            DriftError::NotApplicable(_) => FailureClass::NonApplicable,
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("required field missing for source {source_type}: {field}")]
    MissingRequiredField {
        source_type: String,
        field: String,
    },
    #[error("policy pack failed validation: {0}")]
    PolicyPackInvalid(String),
    #[error("llm response failed schema validation: {0}")]
    LlmResponseInvalid(String),
}

impl SchemaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SchemaError::MissingRequiredField { .. } => ErrorCode::ExtractedSchemaViolation,
            SchemaError::PolicyPackInvalid(_) => ErrorCode::PolicyPackValidation,
            SchemaError::LlmResponseInvalid(_) => ErrorCode::LlmSchemaValidation,
        }
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("adapter authentication failed: {0}")]
    Auth(String),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("optimistic concurrency conflict on {doc_ref}: expected revision {expected}, found {actual}")]
    Conflict {
        doc_ref: String,
        expected: String,
        actual: String,
    },
    #[error("rate limited by upstream: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("transient network error: {0}")]
    Network(String),
    #[error("adapter operation timed out after {0}ms")]
    Timeout(u64),
}

impl AdapterError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AdapterError::Auth(_) => ErrorCode::AdapterAuth,
            AdapterError::NotFound(_) => ErrorCode::AdapterNotFound,
            AdapterError::Conflict { .. } => ErrorCode::ConfluenceConflict,
            AdapterError::RateLimited { .. } => ErrorCode::GithubRateLimit,
            AdapterError::Network(_) => ErrorCode::GithubRateLimit,
            AdapterError::Timeout(_) => ErrorCode::BudgetExceeded,
        }
    }

    pub fn failure_class(&self) -> FailureClass {
        match self {
            AdapterError::Auth(_) | AdapterError::NotFound(_) => FailureClass::Permanent,
            AdapterError::Conflict { .. } => FailureClass::Permanent,
            AdapterError::RateLimited { .. }
            | AdapterError::Network(_)
            | AdapterError::Timeout(_) => FailureClass::Transient,
        }
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("merge strategy conflict across packs: {0}")]
    MergeStrategyConflict(String),
    #[error("unknown comparator referenced: {0}")]
    UnknownComparator(String),
}

impl PolicyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PolicyError::MergeStrategyConflict(_) => ErrorCode::PackMergeConflict,
            PolicyError::UnknownComparator(_) => ErrorCode::UnknownComparator,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request timed out")]
    Timeout,
    #[error("llm transient failure: {0}")]
    Transient(String),
    #[error("llm response failed schema validation: {0}")]
    SchemaValidation(String),
}

impl LlmError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LlmError::Timeout => ErrorCode::BudgetExceeded,
            LlmError::Transient(_) => ErrorCode::RetryExhausted,
            LlmError::SchemaValidation(_) => ErrorCode::LlmSchemaValidation,
        }
    }

    pub fn failure_class(&self) -> FailureClass {
        match self {
            LlmError::Timeout | LlmError::Transient(_) => FailureClass::Transient,
            LlmError::SchemaValidation(_) => FailureClass::Permanent,
        }
    }
}

#[derive(Debug, Error)]
pub enum StateMachineError {
    #[error("stage budget exceeded after {0}ms")]
    BudgetExceeded(u64),
    #[error("lost compare-and-swap race on candidate {0}")]
    ConcurrentUpdate(String),
}
