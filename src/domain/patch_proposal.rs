use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStyle {
    ReplaceSteps,
    AddNote,
    ReorderSteps,
    UpdateOwnerBlock,
    AddSection,
    UpdateDescription,
    UpdateParam,
    UpdatePath,
    AddExample,
    UpdateJsdoc,
    CreatePr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Pending,
    Approved,
    Rejected,
    Snoozed,
    Applied,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchProposal {
    pub workspace_id: String,
    pub drift_id: String,
    pub doc_ref: String,
    pub base_revision: String,
    pub proposed_content: String,
    pub style: PatchStyle,
    pub confidence: f64,
    pub status: PatchStatus,
    pub slack_message_ts: Option<String>,
    pub rejection_reason: Option<String>,
    pub rejection_tags: Option<Vec<String>>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub last_notified_at: Option<DateTime<Utc>>,
}
