use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The shapes the transport layer hands to the core (§6.1) — already
/// signature-verified, already typed. The core's job starts here: turn this
/// into a canonical `SignalEvent` and validate it semantically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGithubPr {
    pub action: String,
    pub pull_request: RawPullRequest,
    pub repository: RawRepository,
    pub installation_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub user_login: String,
    pub merged: bool,
    pub base_ref: String,
    pub head_ref: String,
    pub head_sha: String,
    pub changed_files: Vec<RawChangedFile>,
    pub diff: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawChangedFile {
    pub path: String,
    pub status: String,
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRepository {
    pub name: String,
    pub full_name: String,
    pub owner_login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPagerdutyIncident {
    pub incident_id: String,
    pub status: String,
    pub priority: Option<String>,
    pub service: String,
    pub duration_seconds: Option<u64>,
    pub timeline: Vec<RawTimelineEntry>,
    pub responders: Vec<String>,
    pub escalation_policy: String,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTimelineEntry {
    pub at: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSlackCluster {
    pub channel: String,
    pub representative_question: String,
    pub samples: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub message_count: u32,
    pub unique_askers: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAlert {
    pub monitor_name: String,
    pub severity: String,
    pub alert_type: String,
    pub metric: Option<String>,
    pub threshold: Option<f64>,
    pub current_value: Option<f64>,
    pub tags: Vec<String>,
    pub alert_id: String,
    pub alert_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCodeownersChange {
    pub changed_paths: Vec<String>,
    pub diff: String,
    pub pr_number: u64,
    pub repository: RawRepository,
}
