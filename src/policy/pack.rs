use super::conditions::Condition;
use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// The parsed, in-memory form of a `PolicyPack` (§4.4). The persisted
/// envelope lives in `crate::domain::policy_pack::PolicyPack`; this is what
/// the evaluator actually walks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedPolicyPack {
    pub metadata: PackMetadata,
    pub scope: PackScope,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub scope_priority: i32,
    pub scope_merge_strategy: MergeStrategy,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeStrategy {
    MostRestrictive,
    HighestPriority,
    Explicit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackScope {
    #[serde(rename = "type")]
    pub scope_type: String,
    #[serde(default)]
    pub repos: IncludeExclude,
    #[serde(default)]
    pub branches: IncludeExclude,
    #[serde(default)]
    pub actor_signals: Vec<String>,
    #[serde(default)]
    pub pr_events: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeExclude {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub trigger: Trigger,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
    #[serde(default)]
    pub skip_if: Option<SkipIf>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default)]
    pub any_changed_paths: Vec<String>,
    #[serde(default)]
    pub all_changed_paths: Vec<String>,
    #[serde(default)]
    pub always: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obligation {
    pub comparator_id: String,
    #[serde(default)]
    pub params: Value,
    pub severity: String,
    pub decision_on_fail: DecisionOnFail,
    /// Fact-based gate evaluated alongside the comparator (§4.4): when
    /// present and false, the obligation is skipped rather than checked.
    #[serde(default)]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOnFail {
    Pass,
    Warn,
    Block,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipIf {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub all_changed_paths: Vec<String>,
    #[serde(default)]
    pub pr_body_contains: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSettings {
    #[serde(default)]
    pub external_dependency_mode: Option<String>,
    #[serde(default)]
    pub total_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub per_comparator_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub max_api_calls: Option<u32>,
}

/// Array paths that are treated as *sets* during canonicalization: sorted
/// regardless of authoring order. Every other array is *ordered* and
/// preserves authoring order (§4.4).
const SET_LIKE_ARRAY_PATHS: &[&str] = &[
    "metadata.tags",
    "scope.branches.include",
    "scope.branches.exclude",
    "trigger.anyChangedPaths",
    "trigger.allChangedPaths",
    "scope.actorSignals",
    "scope.prEvents",
    "artifacts.requiredTypes",
    // `skipIf` is nested under each rule rather than `evaluation` in this
    // schema; both spellings are listed since canonicalization does not
    // track array indices in the path.
    "evaluation.skipIf.labels",
    "evaluation.skipIf.allChangedPaths",
    "evaluation.skipIf.prBodyContains",
    "rules.skipIf.labels",
    "rules.skipIf.allChangedPaths",
    "rules.skipIf.prBodyContains",
];

pub fn parse(raw_yaml: &str) -> Result<ParsedPolicyPack, SchemaError> {
    serde_yaml::from_str(raw_yaml).map_err(|e| SchemaError::PolicyPackInvalid(e.to_string()))
}

/// Recursively canonicalizes the parsed pack's JSON form: object keys
/// sorted at every depth, set-like array paths sorted, all other arrays
/// left in authoring order, `null` in place of `undefined`, empty objects
/// dropped (§4.4). Returns the canonical JSON string ready for hashing.
pub fn canonicalize(pack: &ParsedPolicyPack) -> Result<String, SchemaError> {
    let value = serde_json::to_value(pack).map_err(|e| SchemaError::PolicyPackInvalid(e.to_string()))?;
    let canon = canonicalize_value(&value, "");
    serde_json::to_string(&canon).map_err(|e| SchemaError::PolicyPackInvalid(e.to_string()))
}

fn canonicalize_value(value: &Value, path: &str) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(String, Value)> = map
                .iter()
                .filter(|(_, v)| !is_droppable_empty_object(v))
                .map(|(k, v)| {
                    let child_path = if path.is_empty() {
                        k.clone()
                    } else {
                        format!("{path}.{k}")
                    };
                    (k.clone(), canonicalize_value(v, &child_path))
                })
                .collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => {
            let canon_items: Vec<Value> = items
                .iter()
                .map(|v| canonicalize_value(v, path))
                .collect();
            if SET_LIKE_ARRAY_PATHS.iter().any(|p| *p == path) {
                let mut sortable = canon_items;
                sortable.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
                Value::Array(sortable)
            } else {
                Value::Array(canon_items)
            }
        }
        other => other.clone(),
    }
}

fn is_droppable_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

/// SHA-256 over the canonical JSON. Stored full (64 hex chars); displayed
/// short as the first 16 (§4.4).
pub fn version_hash(pack: &ParsedPolicyPack) -> Result<String, SchemaError> {
    let canon = canonicalize(pack)?;
    let mut hasher = Sha256::new();
    hasher.update(canon.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn short_hash(full_hash: &str) -> &str {
    &full_hash[..16.min(full_hash.len())]
}
