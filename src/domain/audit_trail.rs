use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable row per state transition or human action (§3). Retention
/// is bounded by a per-tenant policy enforced by the repository layer, not
/// by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrailRow {
    pub workspace_id: String,
    pub drift_id: String,
    pub from_state: Option<String>,
    pub to_state: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub metadata: serde_json::Value,
}

impl AuditTrailRow {
    pub fn transition(
        workspace_id: impl Into<String>,
        drift_id: impl Into<String>,
        from_state: Option<&str>,
        to_state: &str,
        actor: impl Into<String>,
        duration_ms: u64,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            drift_id: drift_id.into(),
            from_state: from_state.map(String::from),
            to_state: to_state.to_string(),
            actor: actor.into(),
            timestamp: Utc::now(),
            duration_ms,
            metadata,
        }
    }
}
