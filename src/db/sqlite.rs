//! sqlx-backed SQLite implementations of the repository traits (§3, §5).
//!
//! Each table keeps the columns callers filter or CAS on (state,
//! fingerprints, status) typed, and stores the rest of the entity as a JSON
//! envelope in a `data` column — the same split the rest of the crate uses
//! for signal payloads and comparison results, rather than hand-maintaining
//! a column per field.

use super::repositories::{
    AuditTrailRepository, DriftCandidateRepository, EvidenceBundleRepository,
    PatchProposalRepository, PolicyPackRepository, SignalEventRepository,
    SuppressionRuleRepository, WorkspaceRepository,
};
use crate::domain::{
    AuditTrailRow, DriftCandidate, DriftState, EvidenceBundle, PatchProposal, PatchStatus,
    PolicyPack, PolicyPackStatus, SignalEvent, SuppressionRule, Workspace,
};
use crate::error::{DriftError, StateMachineError};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

fn to_json(value: &impl serde::Serialize) -> Result<String, DriftError> {
    serde_json::to_string(value).map_err(|e| DriftError::Database(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T, DriftError> {
    serde_json::from_str(raw).map_err(|e| DriftError::Database(e.to_string()))
}

fn sqlx_err(e: sqlx::Error) -> DriftError {
    DriftError::Database(e.to_string())
}

pub struct SqliteWorkspaceRepository {
    pool: SqlitePool,
}

impl SqliteWorkspaceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkspaceRepository for SqliteWorkspaceRepository {
    async fn get(&self, workspace_id: &str) -> Result<Option<Workspace>, DriftError> {
        let row = sqlx::query("SELECT data FROM workspaces WHERE id = ?1")
            .bind(workspace_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_err)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn upsert(&self, workspace: &Workspace) -> Result<(), DriftError> {
        let data = to_json(workspace)?;
        sqlx::query("INSERT OR REPLACE INTO workspaces (id, data) VALUES (?1, ?2)")
            .bind(&workspace.id)
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(sqlx_err)?;
        Ok(())
    }
}

pub struct SqliteSignalEventRepository {
    pool: SqlitePool,
}

impl SqliteSignalEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SignalEventRepository for SqliteSignalEventRepository {
    async fn get(&self, workspace_id: &str, id: &str) -> Result<Option<SignalEvent>, DriftError> {
        let row = sqlx::query(
            "SELECT data FROM signal_events WHERE workspace_id = ?1 AND id = ?2",
        )
        .bind(workspace_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn insert(&self, event: &SignalEvent) -> Result<(), DriftError> {
        let data = to_json(event)?;
        sqlx::query(
            "INSERT OR IGNORE INTO signal_events (workspace_id, id, source_type, occurred_at, data) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&event.workspace_id)
        .bind(&event.id)
        .bind(event.source_type.as_str())
        .bind(event.occurred_at.to_rfc3339())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;
        Ok(())
    }
}

pub struct SqliteDriftCandidateRepository {
    pool: SqlitePool,
}

impl SqliteDriftCandidateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DriftCandidateRepository for SqliteDriftCandidateRepository {
    async fn get(&self, workspace_id: &str, id: &str) -> Result<Option<DriftCandidate>, DriftError> {
        let row = sqlx::query(
            "SELECT data FROM drift_candidates WHERE workspace_id = ?1 AND id = ?2",
        )
        .bind(workspace_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn insert(&self, candidate: &DriftCandidate) -> Result<(), DriftError> {
        let data = to_json(candidate)?;
        sqlx::query(
            "INSERT INTO drift_candidates \
             (workspace_id, id, signal_event_id, state, state_updated_at, retry_count, \
              fingerprint_strict, fingerprint_medium, fingerprint_broad, trace_id, data) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&candidate.workspace_id)
        .bind(&candidate.id)
        .bind(&candidate.signal_event_id)
        .bind(candidate.state.as_str())
        .bind(candidate.state_updated_at.to_rfc3339())
        .bind(candidate.retry_count as i64)
        .bind(&candidate.fingerprint_strict)
        .bind(&candidate.fingerprint_medium)
        .bind(&candidate.fingerprint_broad)
        .bind(&candidate.trace_id)
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;
        Ok(())
    }

    async fn advance(
        &self,
        candidate: &DriftCandidate,
        expected_state: DriftState,
        expected_state_updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), DriftError> {
        let data = to_json(candidate)?;
        let result = sqlx::query(
            "UPDATE drift_candidates SET \
             state = ?1, state_updated_at = ?2, retry_count = ?3, \
             fingerprint_strict = ?4, fingerprint_medium = ?5, fingerprint_broad = ?6, data = ?7 \
             WHERE workspace_id = ?8 AND id = ?9 AND state = ?10 AND state_updated_at = ?11",
        )
        .bind(candidate.state.as_str())
        .bind(candidate.state_updated_at.to_rfc3339())
        .bind(candidate.retry_count as i64)
        .bind(&candidate.fingerprint_strict)
        .bind(&candidate.fingerprint_medium)
        .bind(&candidate.fingerprint_broad)
        .bind(data)
        .bind(&candidate.workspace_id)
        .bind(&candidate.id)
        .bind(expected_state.as_str())
        .bind(expected_state_updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(DriftError::StateMachine(StateMachineError::ConcurrentUpdate(
                candidate.id.clone(),
            )));
        }
        Ok(())
    }

    async fn find_by_fingerprint(
        &self,
        workspace_id: &str,
        fingerprint: &str,
    ) -> Result<Vec<DriftCandidate>, DriftError> {
        let rows = sqlx::query(
            "SELECT data FROM drift_candidates \
             WHERE workspace_id = ?1 \
             AND (fingerprint_strict = ?2 OR fingerprint_medium = ?2 OR fingerprint_broad = ?2)",
        )
        .bind(workspace_id)
        .bind(fingerprint)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter()
            .map(|r| from_json(r.get::<String, _>("data").as_str()))
            .collect()
    }

    async fn find_in_flight(&self, workspace_id: &str) -> Result<Vec<DriftCandidate>, DriftError> {
        let rows = sqlx::query("SELECT data FROM drift_candidates WHERE workspace_id = ?1")
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err)?;

        rows.iter()
            .map(|r| from_json::<DriftCandidate>(r.get::<String, _>("data").as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map(|candidates| {
                candidates
                    .into_iter()
                    .filter(|c| !c.state.is_terminal())
                    .collect()
            })
    }
}

pub struct SqliteEvidenceBundleRepository {
    pool: SqlitePool,
}

impl SqliteEvidenceBundleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvidenceBundleRepository for SqliteEvidenceBundleRepository {
    async fn get(
        &self,
        workspace_id: &str,
        bundle_id: &str,
    ) -> Result<Option<EvidenceBundle>, DriftError> {
        let row = sqlx::query(
            "SELECT data FROM evidence_bundles WHERE workspace_id = ?1 AND bundle_id = ?2",
        )
        .bind(workspace_id)
        .bind(bundle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn insert(&self, bundle: &EvidenceBundle) -> Result<(), DriftError> {
        let data = to_json(bundle)?;
        sqlx::query(
            "INSERT INTO evidence_bundles \
             (workspace_id, bundle_id, drift_candidate_id, schema_version, created_at, data) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&bundle.workspace_id)
        .bind(&bundle.bundle_id)
        .bind(&bundle.drift_candidate_id)
        .bind(bundle.schema_version as i64)
        .bind(bundle.created_at.to_rfc3339())
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;
        Ok(())
    }
}

pub struct SqlitePatchProposalRepository {
    pool: SqlitePool,
}

impl SqlitePatchProposalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn patch_status_str(status: PatchStatus) -> &'static str {
    match status {
        PatchStatus::Pending => "pending",
        PatchStatus::Approved => "approved",
        PatchStatus::Rejected => "rejected",
        PatchStatus::Snoozed => "snoozed",
        PatchStatus::Applied => "applied",
        PatchStatus::Failed => "failed",
    }
}

#[async_trait]
impl PatchProposalRepository for SqlitePatchProposalRepository {
    async fn get(
        &self,
        workspace_id: &str,
        drift_id: &str,
        doc_ref: &str,
    ) -> Result<Option<PatchProposal>, DriftError> {
        let row = sqlx::query(
            "SELECT data FROM patch_proposals \
             WHERE workspace_id = ?1 AND drift_id = ?2 AND doc_ref = ?3",
        )
        .bind(workspace_id)
        .bind(drift_id)
        .bind(doc_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlx_err)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn upsert(&self, proposal: &PatchProposal) -> Result<(), DriftError> {
        let data = to_json(proposal)?;
        sqlx::query(
            "INSERT OR REPLACE INTO patch_proposals \
             (workspace_id, drift_id, doc_ref, status, data) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&proposal.workspace_id)
        .bind(&proposal.drift_id)
        .bind(&proposal.doc_ref)
        .bind(patch_status_str(proposal.status))
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;
        Ok(())
    }

    async fn find_by_status(
        &self,
        workspace_id: &str,
        status: PatchStatus,
    ) -> Result<Vec<PatchProposal>, DriftError> {
        let rows = sqlx::query(
            "SELECT data FROM patch_proposals WHERE workspace_id = ?1 AND status = ?2",
        )
        .bind(workspace_id)
        .bind(patch_status_str(status))
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter()
            .map(|r| from_json(r.get::<String, _>("data").as_str()))
            .collect()
    }
}

pub struct SqlitePolicyPackRepository {
    pool: SqlitePool,
}

impl SqlitePolicyPackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn policy_pack_status_str(status: PolicyPackStatus) -> &'static str {
    match status {
        PolicyPackStatus::Draft => "draft",
        PolicyPackStatus::Published => "published",
        PolicyPackStatus::Archived => "archived",
    }
}

#[async_trait]
impl PolicyPackRepository for SqlitePolicyPackRepository {
    async fn get(&self, workspace_id: &str, id: &str) -> Result<Option<PolicyPack>, DriftError> {
        let row = sqlx::query("SELECT data FROM policy_packs WHERE workspace_id = ?1 AND id = ?2")
            .bind(workspace_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(sqlx_err)?;
        row.map(|r| from_json(r.get::<String, _>("data").as_str()))
            .transpose()
    }

    async fn upsert(&self, pack: &PolicyPack) -> Result<(), DriftError> {
        let data = to_json(pack)?;
        sqlx::query(
            "INSERT OR REPLACE INTO policy_packs \
             (workspace_id, id, version_hash, status, published_at, data) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&pack.workspace_id)
        .bind(&pack.id)
        .bind(&pack.version_hash)
        .bind(policy_pack_status_str(pack.status))
        .bind(pack.published_at.map(|t| t.to_rfc3339()))
        .bind(data)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;
        Ok(())
    }

    async fn find_by_status(
        &self,
        workspace_id: &str,
        status: PolicyPackStatus,
    ) -> Result<Vec<PolicyPack>, DriftError> {
        let rows = sqlx::query("SELECT data FROM policy_packs WHERE workspace_id = ?1 AND status = ?2")
            .bind(workspace_id)
            .bind(policy_pack_status_str(status))
            .fetch_all(&self.pool)
            .await
            .map_err(sqlx_err)?;

        rows.iter()
            .map(|r| from_json(r.get::<String, _>("data").as_str()))
            .collect()
    }
}

pub struct SqliteAuditTrailRepository {
    pool: SqlitePool,
}

impl SqliteAuditTrailRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditTrailRepository for SqliteAuditTrailRepository {
    async fn append(&self, row: &AuditTrailRow) -> Result<(), DriftError> {
        let metadata = to_json(&row.metadata)?;
        sqlx::query(
            "INSERT INTO audit_trail \
             (workspace_id, drift_id, from_state, to_state, actor, timestamp, duration_ms, metadata) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&row.workspace_id)
        .bind(&row.drift_id)
        .bind(&row.from_state)
        .bind(&row.to_state)
        .bind(&row.actor)
        .bind(row.timestamp.to_rfc3339())
        .bind(row.duration_ms as i64)
        .bind(metadata)
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;
        Ok(())
    }

    async fn find_for_drift(
        &self,
        workspace_id: &str,
        drift_id: &str,
    ) -> Result<Vec<AuditTrailRow>, DriftError> {
        let rows = sqlx::query(
            "SELECT workspace_id, drift_id, from_state, to_state, actor, timestamp, duration_ms, metadata \
             FROM audit_trail WHERE workspace_id = ?1 AND drift_id = ?2 ORDER BY timestamp ASC",
        )
        .bind(workspace_id)
        .bind(drift_id)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter()
            .map(|r| {
                let metadata: serde_json::Value = from_json(r.get::<String, _>("metadata").as_str())?;
                let timestamp = chrono::DateTime::parse_from_rfc3339(r.get::<String, _>("timestamp").as_str())
                    .map_err(|e| DriftError::Database(e.to_string()))?
                    .with_timezone(&chrono::Utc);
                Ok(AuditTrailRow {
                    workspace_id: r.get("workspace_id"),
                    drift_id: r.get("drift_id"),
                    from_state: r.get("from_state"),
                    to_state: r.get("to_state"),
                    actor: r.get("actor"),
                    timestamp,
                    duration_ms: r.get::<i64, _>("duration_ms") as u64,
                    metadata,
                })
            })
            .collect()
    }
}

pub struct SqliteSuppressionRuleRepository {
    pool: SqlitePool,
}

impl SqliteSuppressionRuleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn fingerprint_level_str(level: crate::domain::FingerprintLevel) -> &'static str {
    match level {
        crate::domain::FingerprintLevel::Strict => "strict",
        crate::domain::FingerprintLevel::Medium => "medium",
        crate::domain::FingerprintLevel::Broad => "broad",
    }
}

#[async_trait]
impl SuppressionRuleRepository for SqliteSuppressionRuleRepository {
    async fn find_matching(
        &self,
        workspace_id: &str,
        fingerprint: &str,
    ) -> Result<Vec<SuppressionRule>, DriftError> {
        let rows = sqlx::query(
            "SELECT workspace_id, fingerprint, level, reason, created_by, expires_at \
             FROM suppression_rules WHERE workspace_id = ?1 AND fingerprint = ?2",
        )
        .bind(workspace_id)
        .bind(fingerprint)
        .fetch_all(&self.pool)
        .await
        .map_err(sqlx_err)?;

        rows.iter()
            .map(|r| {
                let level = match r.get::<String, _>("level").as_str() {
                    "strict" => crate::domain::FingerprintLevel::Strict,
                    "medium" => crate::domain::FingerprintLevel::Medium,
                    _ => crate::domain::FingerprintLevel::Broad,
                };
                let expires_at = r
                    .get::<Option<String>, _>("expires_at")
                    .map(|s| {
                        chrono::DateTime::parse_from_rfc3339(&s)
                            .map(|t| t.with_timezone(&chrono::Utc))
                            .map_err(|e| DriftError::Database(e.to_string()))
                    })
                    .transpose()?;
                Ok(SuppressionRule {
                    workspace_id: r.get("workspace_id"),
                    fingerprint: r.get("fingerprint"),
                    level,
                    reason: r.get("reason"),
                    created_by: r.get("created_by"),
                    expires_at,
                })
            })
            .collect()
    }

    async fn upsert(&self, rule: &SuppressionRule) -> Result<(), DriftError> {
        sqlx::query(
            "INSERT OR REPLACE INTO suppression_rules \
             (workspace_id, fingerprint, level, reason, created_by, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&rule.workspace_id)
        .bind(&rule.fingerprint)
        .bind(fingerprint_level_str(rule.level))
        .bind(&rule.reason)
        .bind(rule.created_by.clone())
        .bind(rule.expires_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(sqlx_err)?;
        Ok(())
    }
}
