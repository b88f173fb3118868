use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six supported inbound source types (§3, §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    GithubPr,
    PagerdutyIncident,
    SlackCluster,
    DatadogAlert,
    GrafanaAlert,
    GithubIac,
    GithubCodeowners,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::GithubPr => "github_pr",
            SourceType::PagerdutyIncident => "pagerduty_incident",
            SourceType::SlackCluster => "slack_cluster",
            SourceType::DatadogAlert => "datadog_alert",
            SourceType::GrafanaAlert => "grafana_alert",
            SourceType::GithubIac => "github_iac",
            SourceType::GithubCodeowners => "github_codeowners",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source-specific structured payload. A tagged union keyed by `sourceType`
/// per §9, replacing the loose-map representation the source treats these
/// as.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "sourceType", rename_all = "snake_case")]
pub enum ExtractedPayload {
    GithubPr {
        merged: bool,
        changed_files: Vec<ChangedFile>,
        total_changes: u32,
        diff: String,
        pr_number: u64,
        pr_title: String,
        pr_body: Option<String>,
        author: String,
        base_ref: String,
        head_ref: String,
        head_sha: String,
    },
    PagerdutyIncident {
        status: String,
        service: String,
        responders: Vec<String>,
        timeline: Vec<TimelineEntry>,
        escalation_policy: String,
        teams: Vec<String>,
        priority: Option<String>,
    },
    SlackCluster {
        cluster_size: u32,
        unique_askers: u32,
        questions: Vec<String>,
        messages: Vec<String>,
        channel: String,
    },
    DatadogAlert {
        monitor_name: String,
        severity: String,
        alert_type: String,
        tags: Vec<String>,
        alert_id: String,
        alert_url: Option<String>,
        metric: Option<String>,
        threshold: Option<f64>,
        current_value: Option<f64>,
    },
    GrafanaAlert {
        monitor_name: String,
        severity: String,
        alert_type: String,
        tags: Vec<String>,
        alert_id: String,
        alert_url: Option<String>,
    },
    GithubIac {
        changed_files: Vec<ChangedFile>,
        diff: String,
        pr_number: u64,
    },
    GithubCodeowners {
        changed_paths: Vec<String>,
        diff: String,
        pr_number: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    pub status: ChangeStatus,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: DateTime<Utc>,
    pub description: String,
}

/// The canonicalized inbound event (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    pub workspace_id: String,
    pub id: String,
    pub source_type: SourceType,
    pub occurred_at: DateTime<Utc>,
    pub service: Option<String>,
    pub repo: Option<String>,
    pub severity: Option<String>,
    pub extracted: ExtractedPayload,
    pub raw_payload: serde_json::Value,
}

impl SignalEvent {
    /// Deterministic id derivation so re-delivered webhooks are idempotent
    /// (§3 uniqueness invariant).
    pub fn derive_id(source_type: SourceType, parts: &[&str]) -> String {
        format!("{}_{}", source_type.as_str(), parts.join("_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_id_is_deterministic_for_the_same_parts() {
        let a = SignalEvent::derive_id(SourceType::GithubPr, &["acme", "web", "42"]);
        let b = SignalEvent::derive_id(SourceType::GithubPr, &["acme", "web", "42"]);
        assert_eq!(a, b);
        assert_eq!(a, "github_pr_acme_web_42");
    }

    #[test]
    fn derive_id_differs_across_source_types() {
        let pr = SignalEvent::derive_id(SourceType::GithubPr, &["1"]);
        let incident = SignalEvent::derive_id(SourceType::PagerdutyIncident, &["1"]);
        assert_ne!(pr, incident);
    }
}
