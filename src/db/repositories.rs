use crate::domain::{
    AuditTrailRow, DriftCandidate, DriftState, EvidenceBundle, PatchProposal, PatchStatus,
    PolicyPack, PolicyPackStatus, SignalEvent, SuppressionRule, Workspace,
};
use crate::error::DriftError;
use async_trait::async_trait;

/// Tenant configuration, keyed by workspace id alone (§3).
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    async fn get(&self, workspace_id: &str) -> Result<Option<Workspace>, DriftError>;
    async fn upsert(&self, workspace: &Workspace) -> Result<(), DriftError>;
}

/// Canonicalized inbound events (§3). Append-only: a signal event is never
/// updated once ingested.
#[async_trait]
pub trait SignalEventRepository: Send + Sync {
    async fn get(&self, workspace_id: &str, id: &str) -> Result<Option<SignalEvent>, DriftError>;
    async fn insert(&self, event: &SignalEvent) -> Result<(), DriftError>;
}

/// The FSM's unit of work (§3, §4.1). `advance` is the only mutator that
/// changes `state`, and does so with a compare-and-swap on the state the
/// caller last observed so two stage handlers racing on the same candidate
/// can't silently clobber each other (§5).
#[async_trait]
pub trait DriftCandidateRepository: Send + Sync {
    async fn get(&self, workspace_id: &str, id: &str) -> Result<Option<DriftCandidate>, DriftError>;

    async fn insert(&self, candidate: &DriftCandidate) -> Result<(), DriftError>;

    /// Persists every field of `candidate`, enforcing that the row's state
    /// and `state_updated_at` still match what the caller last observed
    /// (§4.1, §5). Returns `StateMachineError::ConcurrentUpdate` if another
    /// writer already advanced the row past that snapshot.
    async fn advance(
        &self,
        candidate: &DriftCandidate,
        expected_state: DriftState,
        expected_state_updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DriftError>;

    async fn find_by_fingerprint(
        &self,
        workspace_id: &str,
        fingerprint: &str,
    ) -> Result<Vec<DriftCandidate>, DriftError>;

    /// Rows parked in a non-terminal state, for the queue consumer to
    /// re-drive after a restart.
    async fn find_in_flight(&self, workspace_id: &str) -> Result<Vec<DriftCandidate>, DriftError>;
}

/// Immutable, content-addressed classification inputs (§3). Never updated
/// after insert; re-evaluation writes a new row with a new `bundle_id`.
#[async_trait]
pub trait EvidenceBundleRepository: Send + Sync {
    async fn get(
        &self,
        workspace_id: &str,
        bundle_id: &str,
    ) -> Result<Option<EvidenceBundle>, DriftError>;
    async fn insert(&self, bundle: &EvidenceBundle) -> Result<(), DriftError>;
}

/// Proposed document edits awaiting human review (§3, §4.7).
#[async_trait]
pub trait PatchProposalRepository: Send + Sync {
    async fn get(
        &self,
        workspace_id: &str,
        drift_id: &str,
        doc_ref: &str,
    ) -> Result<Option<PatchProposal>, DriftError>;
    async fn upsert(&self, proposal: &PatchProposal) -> Result<(), DriftError>;
    async fn find_by_status(
        &self,
        workspace_id: &str,
        status: PatchStatus,
    ) -> Result<Vec<PatchProposal>, DriftError>;
}

/// Versioned, canonical-hashed policy documents (§3, §4.4).
#[async_trait]
pub trait PolicyPackRepository: Send + Sync {
    async fn get(&self, workspace_id: &str, id: &str) -> Result<Option<PolicyPack>, DriftError>;
    async fn upsert(&self, pack: &PolicyPack) -> Result<(), DriftError>;
    async fn find_by_status(
        &self,
        workspace_id: &str,
        status: PolicyPackStatus,
    ) -> Result<Vec<PolicyPack>, DriftError>;
}

/// Append-only history of state transitions and human actions (§3).
#[async_trait]
pub trait AuditTrailRepository: Send + Sync {
    async fn append(&self, row: &AuditTrailRow) -> Result<(), DriftError>;
    async fn find_for_drift(
        &self,
        workspace_id: &str,
        drift_id: &str,
    ) -> Result<Vec<AuditTrailRow>, DriftError>;
}

/// Learned suppressions keyed by `(workspace, fingerprint, level)` (§3, §8).
#[async_trait]
pub trait SuppressionRuleRepository: Send + Sync {
    async fn find_matching(
        &self,
        workspace_id: &str,
        fingerprint: &str,
    ) -> Result<Vec<SuppressionRule>, DriftError>;
    async fn upsert(&self, rule: &SuppressionRule) -> Result<(), DriftError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Confirms the trait object is object-safe and usable behind `dyn`,
    /// the shape every stage handler depends on.
    fn assert_object_safe(_repo: &dyn WorkspaceRepository) {}

    #[test]
    fn workspace_repository_is_object_safe() {
        struct Noop;
        #[async_trait]
        impl WorkspaceRepository for Noop {
            async fn get(&self, _workspace_id: &str) -> Result<Option<Workspace>, DriftError> {
                Ok(None)
            }
            async fn upsert(&self, _workspace: &Workspace) -> Result<(), DriftError> {
                Ok(())
            }
        }
        let noop = Noop;
        assert_object_safe(&noop);
    }
}
