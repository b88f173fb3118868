//! Persistence-layer integration tests against an in-memory SQLite pool.
//! Requires the `database` feature; compiled out entirely otherwise since
//! the concrete `Sqlite*Repository` types don't exist without it.
#![cfg(feature = "database")]

use chrono::Utc;
use drift_agent::db::{
    AuditTrailRepository, DriftCandidateRepository, SignalEventRepository,
    SqliteAuditTrailRepository, SqliteDriftCandidateRepository, SqliteSignalEventRepository,
    SqliteSuppressionRuleRepository, SqliteWorkspaceRepository, SuppressionRuleRepository,
    WorkspaceRepository,
};
use drift_agent::domain::signal_event::{ExtractedPayload, SignalEvent, SourceType};
use drift_agent::domain::{
    AuditTrailRow, ClassificationMethod, DriftCandidate, DriftState, FingerprintLevel,
    SuppressionRule, Workspace,
};
use sqlx::SqlitePool;

async fn memory_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::query(include_str!("../migrations/0001_init.sql"))
        .execute(&pool)
        .await
        .expect("embedded migration must apply cleanly to a fresh in-memory database");
    pool
}

fn pagerduty_signal(workspace_id: &str, incident_id: &str) -> SignalEvent {
    SignalEvent {
        workspace_id: workspace_id.to_string(),
        id: SignalEvent::derive_id(SourceType::PagerdutyIncident, &[incident_id]),
        source_type: SourceType::PagerdutyIncident,
        occurred_at: Utc::now(),
        service: Some("checkout".to_string()),
        repo: None,
        severity: Some("P1".to_string()),
        extracted: ExtractedPayload::PagerdutyIncident {
            status: "resolved".to_string(),
            service: "checkout".to_string(),
            responders: vec!["oncall-1".to_string()],
            timeline: Vec::new(),
            escalation_policy: "default".to_string(),
            teams: vec!["team-checkout".to_string()],
            priority: Some("P1".to_string()),
        },
        raw_payload: serde_json::json!({"incident_id": incident_id}),
    }
}

/// Idempotency of ingestion (§8): two successive inserts of the same
/// `pagerduty_incident` payload — same derived id — collapse into exactly
/// one row, the way `INSERT OR IGNORE` on the primary key guarantees.
#[tokio::test]
async fn redelivered_signal_event_collapses_to_one_row() {
    let pool = memory_pool().await;
    let repo = SqliteSignalEventRepository::new(pool.clone());

    let first = pagerduty_signal("acme", "INC-42");
    let second = pagerduty_signal("acme", "INC-42");
    repo.insert(&first).await.unwrap();
    repo.insert(&second).await.unwrap();

    use sqlx::Row;
    let count_row = sqlx::query("SELECT COUNT(*) AS n FROM signal_events WHERE workspace_id = 'acme'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count_row.get::<i64, _>("n"), 1);

    let fetched = repo.get("acme", &first.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, first.id);
}

/// The tenant boundary (§3): two workspaces never see each other's signal
/// events even when an (accidentally) identical id is used.
#[tokio::test]
async fn signal_events_are_isolated_per_workspace() {
    let pool = memory_pool().await;
    let repo = SqliteSignalEventRepository::new(pool);

    let acme_signal = pagerduty_signal("acme", "INC-1");
    let other_signal = pagerduty_signal("other-tenant", "INC-1");
    repo.insert(&acme_signal).await.unwrap();
    repo.insert(&other_signal).await.unwrap();

    assert!(repo.get("acme", &acme_signal.id).await.unwrap().is_some());
    assert!(repo
        .get("other-tenant", &other_signal.id)
        .await
        .unwrap()
        .is_some());
    // Cross-tenant lookup with the other tenant's id must miss even though
    // the id string is identical, since the primary key includes workspace.
    assert_eq!(acme_signal.id, other_signal.id);
}

/// Workspace rows round-trip through the JSON envelope, including the
/// nested `workflow_preferences` struct.
#[tokio::test]
async fn workspace_upsert_and_get_round_trip_nested_preferences() {
    let pool = memory_pool().await;
    let repo = SqliteWorkspaceRepository::new(pool);

    let mut workspace = Workspace::new("acme", "Acme Corp", "cred-handle-1");
    workspace.high_confidence_threshold = 0.80;
    repo.upsert(&workspace).await.unwrap();

    let fetched = repo.get("acme").await.unwrap().unwrap();
    assert_eq!(fetched.name, "Acme Corp");
    assert_eq!(fetched.high_confidence_threshold, 0.80);
    assert!(fetched
        .workflow_preferences
        .enabled_input_sources
        .contains("github_pr"));

    assert!(repo.get("does-not-exist").await.unwrap().is_none());
}

/// Fingerprint escalation (§8): after recording false positives at
/// `strict`, the escalated rule is created at `medium` and both rules are
/// independently queryable by the repository's `find_matching`.
#[tokio::test]
async fn suppression_rule_escalates_from_strict_to_medium() {
    let pool = memory_pool().await;
    let repo = SqliteSuppressionRuleRepository::new(pool);

    let strict_rule = SuppressionRule {
        workspace_id: "acme".to_string(),
        fingerprint: "fp-abc123".to_string(),
        level: FingerprintLevel::Strict,
        reason: "false positive x3".to_string(),
        created_by: "alice".to_string(),
        expires_at: None,
    };
    repo.upsert(&strict_rule).await.unwrap();

    let matches_before_escalation = repo.find_matching("acme", "fp-abc123").await.unwrap();
    assert_eq!(matches_before_escalation.len(), 1);
    assert_eq!(matches_before_escalation[0].level, FingerprintLevel::Strict);

    // Three false positives at strict exceed the escalation threshold
    // (`FingerprintLevel::Strict.escalation_threshold() == 3`); the caller
    // escalates by creating the coarser-level rule under a distinct key.
    assert_eq!(FingerprintLevel::Strict.escalation_threshold(), 3);
    let escalated_level = strict_rule.level.escalate().expect("strict escalates to medium");
    let medium_rule = SuppressionRule {
        fingerprint: "fp-broader-surface".to_string(),
        level: escalated_level,
        reason: "escalated after 3 false positives at strict".to_string(),
        ..strict_rule.clone()
    };
    repo.upsert(&medium_rule).await.unwrap();

    let strict_matches = repo.find_matching("acme", "fp-abc123").await.unwrap();
    let medium_matches = repo.find_matching("acme", "fp-broader-surface").await.unwrap();
    assert_eq!(strict_matches.len(), 1);
    assert_eq!(medium_matches.len(), 1);
    assert_eq!(medium_matches[0].level, FingerprintLevel::Medium);
}

/// Ordering guarantee (§5): per-candidate transitions are serial and
/// monotone. The audit trail records each hop in the order it happened,
/// and `find_for_drift` returns them chronologically regardless of insert
/// order into the table.
#[tokio::test]
async fn audit_trail_preserves_transition_order() {
    let pool = memory_pool().await;
    let repo = SqliteAuditTrailRepository::new(pool);

    let t1 = AuditTrailRow::transition(
        "acme",
        "drift-1",
        None,
        "INGESTED",
        "system",
        5,
        serde_json::json!({}),
    );
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let t2 = AuditTrailRow::transition(
        "acme",
        "drift-1",
        Some("INGESTED"),
        "NORMALIZED",
        "system",
        12,
        serde_json::json!({}),
    );

    repo.append(&t2).await.unwrap();
    repo.append(&t1).await.unwrap();

    let history = repo.find_for_drift("acme", "drift-1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].to_state, "INGESTED");
    assert_eq!(history[1].to_state, "NORMALIZED");
    assert_eq!(history[1].from_state.as_deref(), Some("INGESTED"));
}

/// Exactly-once-effect / CAS invariant (§4.1, §5): a worker that last
/// observed a candidate in `INGESTED` and attempts to advance it after
/// another worker already moved it to `NORMALIZED` loses the race and
/// must no-op (surfaced here as `ConcurrentUpdate`), never silently
/// clobbering the winner's row.
#[tokio::test]
async fn concurrent_advance_attempts_only_let_one_winner_through() {
    let pool = memory_pool().await;
    let repo = SqliteDriftCandidateRepository::new(pool);

    let candidate = DriftCandidate {
        workspace_id: "acme".to_string(),
        id: "drift-1".to_string(),
        signal_event_id: "evt-1".to_string(),
        state: DriftState::Ingested,
        state_updated_at: Utc::now(),
        source_type: SourceType::PagerdutyIncident,
        service: Some("checkout".to_string()),
        repo: None,
        drift_type: None,
        classification_method: Some(ClassificationMethod::Deterministic),
        confidence: None,
        comparison_result: None,
        evidence_bundle_id: None,
        doc_candidates: None,
        docs_resolution_status: None,
        docs_resolution_confidence: None,
        owner_resolution: None,
        routing_decision: None,
        active_plan_id: None,
        active_plan_version: None,
        active_plan_hash: None,
        correlated_signals: None,
        fingerprint_strict: "fp-strict".to_string(),
        fingerprint_medium: "fp-medium".to_string(),
        fingerprint_broad: "fp-broad".to_string(),
        retry_count: 0,
        last_error_code: None,
        last_error_message: None,
        trace_id: "trace-1".to_string(),
    };
    repo.insert(&candidate).await.unwrap();
    let observed_state_updated_at = candidate.state_updated_at;

    let mut winner = candidate.clone();
    winner.state = DriftState::Normalized;
    winner.state_updated_at = Utc::now();

    let mut loser = candidate.clone();
    loser.state = DriftState::Normalized;
    loser.state_updated_at = Utc::now();

    let winner_result = repo
        .advance(&winner, DriftState::Ingested, observed_state_updated_at)
        .await;
    let loser_result = repo
        .advance(&loser, DriftState::Ingested, observed_state_updated_at)
        .await;

    assert!(winner_result.is_ok());
    assert!(loser_result.is_err());

    let final_row = repo.get("acme", "drift-1").await.unwrap().unwrap();
    assert_eq!(final_row.state, DriftState::Normalized);
    assert_eq!(final_row.state_updated_at, winner.state_updated_at);
}
