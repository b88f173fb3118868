use crate::error::PolicyError;
use serde_json::Value;
use std::collections::HashMap;

/// Facts available to a comparator at evaluation time — a narrowed view
/// over the signal/evidence the rule fired on (§4.4's fact catalog backs
/// the condition evaluator in `conditions.rs`; comparators read the same
/// shape directly rather than through `{fact, operator, value}` triples).
#[derive(Debug, Clone, Default)]
pub struct ComparisonContext {
    pub facts: HashMap<String, Value>,
}

impl ComparisonContext {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.facts.get(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonOutcome {
    pub passed: bool,
    pub detail: Option<String>,
}

/// One entry in the comparator registry (§4.4). `can_compare` lets a
/// comparator opt out when the required artifact type is absent rather
/// than failing closed.
pub trait Comparator: Send + Sync {
    fn comparator_type(&self) -> &'static str;
    fn supported_artifact_types(&self) -> &'static [&'static str];
    fn can_compare(&self, ctx: &ComparisonContext) -> bool;
    fn perform_comparison(&self, ctx: &ComparisonContext, params: &Value) -> ComparisonOutcome;
}

macro_rules! fact_bool {
    ($ctx:expr, $key:expr) => {
        $ctx.get($key).and_then(|v| v.as_bool()).unwrap_or(false)
    };
}

struct ObligationFilePresent;
impl Comparator for ObligationFilePresent {
    fn comparator_type(&self) -> &'static str {
        "obligation.file_present"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["diff"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("diff.filesChanged.paths").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, params: &Value) -> ComparisonOutcome {
        let target = params.get("path").and_then(|v| v.as_str()).unwrap_or("");
        let present = ctx
            .get("diff.filesChanged.paths")
            .and_then(|v| v.as_array())
            .map(|paths| paths.iter().any(|p| p.as_str() == Some(target)))
            .unwrap_or(false);
        ComparisonOutcome {
            passed: present,
            detail: (!present).then(|| format!("{target} not present in diff")),
        }
    }
}

struct OpenapiVersionBump;
impl Comparator for OpenapiVersionBump {
    fn comparator_type(&self) -> &'static str {
        "openapi.version_bump"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["openapi"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("openapi.oldVersion").is_some() && ctx.get("openapi.newVersion").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, _params: &Value) -> ComparisonOutcome {
        let old = ctx.get("openapi.oldVersion").and_then(|v| v.as_str()).unwrap_or("");
        let new = ctx.get("openapi.newVersion").and_then(|v| v.as_str()).unwrap_or("");
        let passed = old != new && !new.is_empty();
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| "openapi version unchanged".to_string()),
        }
    }
}

struct OpenapiSchemaValid;
impl Comparator for OpenapiSchemaValid {
    fn comparator_type(&self) -> &'static str {
        "openapi.schema_valid"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["openapi"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("openapi.schemaValid").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, _params: &Value) -> ComparisonOutcome {
        let passed = fact_bool!(ctx, "openapi.schemaValid");
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| "openapi schema invalid".to_string()),
        }
    }
}

struct ArtifactPresent;
impl Comparator for ArtifactPresent {
    fn comparator_type(&self) -> &'static str {
        "artifact.present"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["any"]
    }
    fn can_compare(&self, _ctx: &ComparisonContext) -> bool {
        true
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, params: &Value) -> ComparisonOutcome {
        let key = params.get("fact").and_then(|v| v.as_str()).unwrap_or("artifact.present");
        let passed = ctx.get(key).is_some();
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| format!("{key} missing")),
        }
    }
}

struct ArtifactUpdated;
impl Comparator for ArtifactUpdated {
    fn comparator_type(&self) -> &'static str {
        "artifact.updated"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["any"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("artifact.updatedAt").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, _params: &Value) -> ComparisonOutcome {
        let passed = fact_bool!(ctx, "artifact.updated");
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| "artifact not updated".to_string()),
        }
    }
}

struct ChecksRunsPassed;
impl Comparator for ChecksRunsPassed {
    fn comparator_type(&self) -> &'static str {
        "checkruns.passed"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["pr"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("pr.checkRuns.allPassed").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, _params: &Value) -> ComparisonOutcome {
        let passed = fact_bool!(ctx, "pr.checkRuns.allPassed");
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| "one or more check runs failed".to_string()),
        }
    }
}

struct MinApprovals;
impl Comparator for MinApprovals {
    fn comparator_type(&self) -> &'static str {
        "min_approvals"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["pr"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("pr.approvals.count").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, params: &Value) -> ComparisonOutcome {
        let min = params.get("min").and_then(|v| v.as_u64()).unwrap_or(1);
        let count = ctx.get("pr.approvals.count").and_then(|v| v.as_u64()).unwrap_or(0);
        let passed = count >= min;
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| format!("{count} approvals, need {min}")),
        }
    }
}

struct HumanApprovalPresent;
impl Comparator for HumanApprovalPresent {
    fn comparator_type(&self) -> &'static str {
        "human_approval_present"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["pr"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("pr.approvals.hasHuman").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, _params: &Value) -> ComparisonOutcome {
        let passed = fact_bool!(ctx, "pr.approvals.hasHuman");
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| "no human approval recorded".to_string()),
        }
    }
}

const DEFAULT_SECRET_PATTERNS: &[&str] = &["-----BEGIN", "AKIA", "sk-"];

struct NoSecretsInDiff;
impl Comparator for NoSecretsInDiff {
    fn comparator_type(&self) -> &'static str {
        "no_secrets_in_diff"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["diff"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("diff.text").is_some()
    }
    /// `params.patterns`, when present, is a per-pack list of regexes to
    /// check instead of the default literal markers. `regex`'s automaton is
    /// non-backtracking (§4.4's requirement for user-supplied patterns),
    /// the same property `evidence::extractor` relies on. A pattern that
    /// fails to compile is skipped rather than failing the whole obligation
    /// closed on an authoring typo.
    fn perform_comparison(&self, ctx: &ComparisonContext, params: &Value) -> ComparisonOutcome {
        let Some(text) = ctx.get("diff.text").and_then(|v| v.as_str()) else {
            return ComparisonOutcome {
                passed: true,
                detail: None,
            };
        };

        let custom_patterns: Vec<String> = params
            .get("patterns")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let matched = if custom_patterns.is_empty() {
            DEFAULT_SECRET_PATTERNS
                .iter()
                .find(|marker| text.contains(**marker))
                .map(|marker| marker.to_string())
        } else {
            custom_patterns.iter().find_map(|pattern| {
                regex::Regex::new(pattern)
                    .ok()
                    .filter(|re| re.is_match(text))
                    .map(|_| pattern.clone())
            })
        };

        ComparisonOutcome {
            passed: matched.is_none(),
            detail: matched.map(|pattern| format!("diff matches secret pattern {pattern}")),
        }
    }
}

struct PrTemplateFieldPresent;
impl Comparator for PrTemplateFieldPresent {
    fn comparator_type(&self) -> &'static str {
        "pr_template_field_present"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["pr"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("pr.body").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, params: &Value) -> ComparisonOutcome {
        let field = params.get("field").and_then(|v| v.as_str()).unwrap_or("");
        let passed = ctx
            .get("pr.body")
            .and_then(|v| v.as_str())
            .map(|b| b.contains(field))
            .unwrap_or(false);
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| format!("PR body missing field {field}")),
        }
    }
}

struct ChangedPathMatches;
impl Comparator for ChangedPathMatches {
    fn comparator_type(&self) -> &'static str {
        "changed_path_matches"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["diff"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("diff.filesChanged.paths").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, params: &Value) -> ComparisonOutcome {
        let pattern = params.get("pattern").and_then(|v| v.as_str()).unwrap_or("");
        let passed = ctx
            .get("diff.filesChanged.paths")
            .and_then(|v| v.as_array())
            .map(|paths| {
                paths
                    .iter()
                    .filter_map(|p| p.as_str())
                    .any(|p| glob_match(pattern, p))
            })
            .unwrap_or(false);
        ComparisonOutcome {
            passed,
            detail: (!passed).then(|| format!("no changed path matches {pattern}")),
        }
    }
}

struct ActorIsAgent;
impl Comparator for ActorIsAgent {
    fn comparator_type(&self) -> &'static str {
        "actor_is_agent"
    }
    fn supported_artifact_types(&self) -> &'static [&'static str] {
        &["pr"]
    }
    fn can_compare(&self, ctx: &ComparisonContext) -> bool {
        ctx.get("actor.user").is_some()
    }
    fn perform_comparison(&self, ctx: &ComparisonContext, _params: &Value) -> ComparisonOutcome {
        let passed = fact_bool!(ctx, "actor.isAgent");
        ComparisonOutcome {
            passed,
            detail: None,
        }
    }
}

/// A minimal glob supporting `*` as "any run of non-slash characters",
/// enough for path patterns like `src/*.rs`.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = candidate;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        match rest.find(part) {
            Some(idx) if i == 0 && idx != 0 => return false,
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    true
}

/// The required comparator set from §4.4, keyed by `comparatorId`.
pub struct ComparatorRegistry {
    comparators: HashMap<&'static str, Box<dyn Comparator>>,
}

impl ComparatorRegistry {
    pub fn with_defaults() -> Self {
        let mut comparators: HashMap<&'static str, Box<dyn Comparator>> = HashMap::new();
        let all: Vec<Box<dyn Comparator>> = vec![
            Box::new(ObligationFilePresent),
            Box::new(OpenapiVersionBump),
            Box::new(OpenapiSchemaValid),
            Box::new(ArtifactPresent),
            Box::new(ArtifactUpdated),
            Box::new(ChecksRunsPassed),
            Box::new(MinApprovals),
            Box::new(HumanApprovalPresent),
            Box::new(NoSecretsInDiff),
            Box::new(PrTemplateFieldPresent),
            Box::new(ChangedPathMatches),
            Box::new(ActorIsAgent),
        ];
        for comparator in all {
            comparators.insert(comparator.comparator_type(), comparator);
        }
        Self { comparators }
    }

    pub fn get(&self, comparator_id: &str) -> Result<&dyn Comparator, PolicyError> {
        self.comparators
            .get(comparator_id)
            .map(|b| b.as_ref())
            .ok_or_else(|| PolicyError::UnknownComparator(comparator_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_resolves_every_required_comparator() {
        let registry = ComparatorRegistry::with_defaults();
        for id in [
            "obligation.file_present",
            "openapi.version_bump",
            "openapi.schema_valid",
            "artifact.present",
            "artifact.updated",
            "checkruns.passed",
            "min_approvals",
            "human_approval_present",
            "no_secrets_in_diff",
            "pr_template_field_present",
            "changed_path_matches",
            "actor_is_agent",
        ] {
            assert!(registry.get(id).is_ok(), "missing comparator {id}");
        }
    }

    #[test]
    fn unknown_comparator_is_an_error() {
        let registry = ComparatorRegistry::with_defaults();
        assert!(registry.get("nonexistent").is_err());
    }

    #[test]
    fn min_approvals_fails_below_threshold() {
        let registry = ComparatorRegistry::with_defaults();
        let comparator = registry.get("min_approvals").unwrap();
        let mut ctx = ComparisonContext::default();
        ctx.facts.insert("pr.approvals.count".into(), json!(1));
        let outcome = comparator.perform_comparison(&ctx, &json!({"min": 2}));
        assert!(!outcome.passed);
    }

    #[test]
    fn no_secrets_in_diff_flags_aws_key_markers() {
        let registry = ComparatorRegistry::with_defaults();
        let comparator = registry.get("no_secrets_in_diff").unwrap();
        let mut ctx = ComparisonContext::default();
        ctx.facts.insert("diff.text".into(), json!("+ key = AKIAEXAMPLE"));
        let outcome = comparator.perform_comparison(&ctx, &json!({}));
        assert!(!outcome.passed);
    }
}
