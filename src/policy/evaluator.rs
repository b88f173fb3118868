use super::comparators::{ComparatorRegistry, ComparisonContext};
use super::conditions;
use super::pack::{DecisionOnFail, ParsedPolicyPack, Rule};
use crate::error::PolicyError;

#[derive(Debug, Clone, PartialEq)]
pub struct ObligationResult {
    pub comparator_id: String,
    pub decision_on_fail: DecisionOnFail,
    pub passed: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub rule_id: String,
    pub skipped: bool,
    pub obligations: Vec<ObligationResult>,
}

impl RuleResult {
    /// The most restrictive failing decision, or `Pass` if every obligation
    /// passed or the rule was skipped.
    pub fn worst_decision(&self) -> DecisionOnFail {
        self.obligations
            .iter()
            .filter(|o| !o.passed)
            .map(|o| o.decision_on_fail)
            .max()
            .unwrap_or(DecisionOnFail::Pass)
    }
}

fn rule_is_triggered(rule: &Rule, changed_paths: &[String]) -> bool {
    if rule.trigger.always {
        return true;
    }
    if !rule.trigger.any_changed_paths.is_empty() {
        return rule
            .trigger
            .any_changed_paths
            .iter()
            .any(|pattern| changed_paths.iter().any(|p| glob_match(pattern, p)));
    }
    if !rule.trigger.all_changed_paths.is_empty() {
        return rule
            .trigger
            .all_changed_paths
            .iter()
            .all(|pattern| changed_paths.iter().any(|p| glob_match(pattern, p)));
    }
    false
}

fn glob_match(pattern: &str, candidate: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == candidate;
    }
    candidate.starts_with(pattern.trim_end_matches('*'))
}

fn rule_is_skipped(rule: &Rule, ctx: &ComparisonContext) -> bool {
    let Some(skip_if) = &rule.skip_if else {
        return false;
    };
    if !skip_if.labels.is_empty() {
        let has_label = ctx
            .get("pr.labels")
            .and_then(|v| v.as_array())
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| l.as_str())
                    .any(|l| skip_if.labels.iter().any(|s| s == l))
            })
            .unwrap_or(false);
        if has_label {
            return true;
        }
    }
    if !skip_if.pr_body_contains.is_empty() {
        let matches_body = ctx
            .get("pr.body")
            .and_then(|v| v.as_str())
            .map(|body| skip_if.pr_body_contains.iter().any(|s| body.contains(s.as_str())))
            .unwrap_or(false);
        if matches_body {
            return true;
        }
    }
    false
}

/// Evaluates every enabled rule in `pack` against `ctx`, bounded by the
/// pack's `evaluation` budgets at the caller level (the budgets themselves
/// gate wall-clock/API-call usage outside pure evaluation, so they are not
/// enforced inside this pure function).
pub fn evaluate_pack(
    pack: &ParsedPolicyPack,
    ctx: &ComparisonContext,
    changed_paths: &[String],
    registry: &ComparatorRegistry,
) -> Result<Vec<RuleResult>, PolicyError> {
    let mut results = Vec::new();
    for rule in &pack.rules {
        if !rule.enabled || !rule_is_triggered(rule, changed_paths) {
            continue;
        }
        if rule_is_skipped(rule, ctx) {
            results.push(RuleResult {
                rule_id: rule.id.clone(),
                skipped: true,
                obligations: vec![],
            });
            continue;
        }

        let mut obligations = Vec::new();
        for obligation in &rule.obligations {
            if let Some(condition) = &obligation.condition {
                if !conditions::evaluate(condition, ctx) {
                    continue;
                }
            }
            let comparator = registry.get(&obligation.comparator_id)?;
            if !comparator.can_compare(ctx) {
                continue;
            }
            let outcome = comparator.perform_comparison(ctx, &obligation.params);
            obligations.push(ObligationResult {
                comparator_id: obligation.comparator_id.clone(),
                decision_on_fail: obligation.decision_on_fail,
                passed: outcome.passed,
                detail: outcome.detail,
            });
        }

        results.push(RuleResult {
            rule_id: rule.id.clone(),
            skipped: false,
            obligations,
        });
    }
    Ok(results)
}
