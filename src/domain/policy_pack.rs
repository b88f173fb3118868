use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPackStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackScopeType {
    Workspace,
    Service,
    Repo,
}

/// A versioned, canonical-hashed YAML document (§3, §4.4). The parsed form
/// lives in `crate::policy::pack::ParsedPolicyPack`; this row is the
/// persisted envelope around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyPack {
    pub workspace_id: String,
    pub id: String,
    pub version_hash: String,
    pub parent_id: Option<String>,
    pub pack_metadata_id: String,
    pub scope_type: PackScopeType,
    pub scope_ref: Option<String>,
    pub status: PolicyPackStatus,
    pub raw_yaml: String,
    pub published_at: Option<DateTime<Utc>>,
}
