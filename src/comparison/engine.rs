use super::keywords;
use super::result::{ComparisonResult, Recommendation};
use crate::domain::drift_candidate::DriftType;
use crate::evidence::BaselineArtifacts;
use std::collections::HashSet;

struct TypeFinding {
    drift_type: DriftType,
    confidence: f64,
    conflicts: Vec<String>,
    new_content: Vec<String>,
    recommendation: Recommendation,
}

fn to_set(field: &Option<Vec<String>>) -> HashSet<&str> {
    field
        .as_ref()
        .map(|v| v.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Compares one pair of token sets (source vs. target) for a drift type.
/// `new_content` is present in the source but not the document (doc is
/// stale); `conflicts` is present in the document but not the source (doc
/// claims something the source no longer supports).
fn diff_sets(
    source: &Option<Vec<String>>,
    target: &Option<Vec<String>>,
) -> (Vec<String>, Vec<String>) {
    let source_set = to_set(source);
    let target_set = to_set(target);

    let mut new_content: Vec<String> = source_set
        .difference(&target_set)
        .map(|s| s.to_string())
        .collect();
    let mut conflicts: Vec<String> = target_set
        .difference(&source_set)
        .map(|s| s.to_string())
        .collect();
    new_content.sort();
    conflicts.sort();
    (new_content, conflicts)
}

fn confidence_from_diff(source_total: usize, diff_count: usize) -> f64 {
    if source_total == 0 {
        return 0.0;
    }
    (diff_count as f64 / source_total as f64).min(1.0)
}

fn check_instruction(source: &BaselineArtifacts, target: &BaselineArtifacts) -> Option<TypeFinding> {
    let (new_content, conflicts) = merge_field_diffs(&[
        diff_sets(&source.commands, &target.commands),
        diff_sets(&source.steps, &target.steps),
    ]);
    if new_content.is_empty() && conflicts.is_empty() {
        return None;
    }
    let source_total = count(&source.commands) + count(&source.steps);
    Some(TypeFinding {
        drift_type: DriftType::Instruction,
        confidence: confidence_from_diff(source_total, new_content.len() + conflicts.len()),
        conflicts,
        new_content,
        recommendation: Recommendation::ReplaceSteps,
    })
}

fn check_process(source: &BaselineArtifacts, target: &BaselineArtifacts) -> Option<TypeFinding> {
    let (new_content, conflicts) = merge_field_diffs(&[
        diff_sets(&source.sequences, &target.sequences),
        diff_sets(&source.decisions, &target.decisions),
    ]);
    if new_content.is_empty() && conflicts.is_empty() {
        return None;
    }
    let source_total = count(&source.sequences) + count(&source.decisions);
    Some(TypeFinding {
        drift_type: DriftType::Process,
        confidence: confidence_from_diff(source_total, new_content.len() + conflicts.len()),
        conflicts,
        new_content,
        recommendation: Recommendation::AddSection,
    })
}

fn check_ownership(source: &BaselineArtifacts, target: &BaselineArtifacts) -> Option<TypeFinding> {
    let (new_content, conflicts) = merge_field_diffs(&[
        diff_sets(&source.owners, &target.owners),
        diff_sets(&source.teams, &target.teams),
    ]);
    if new_content.is_empty() && conflicts.is_empty() {
        return None;
    }
    let source_total = count(&source.owners) + count(&source.teams);
    Some(TypeFinding {
        drift_type: DriftType::Ownership,
        confidence: confidence_from_diff(source_total, new_content.len() + conflicts.len()),
        conflicts,
        new_content,
        recommendation: Recommendation::UpdateOwnership,
    })
}

fn check_environment(source: &BaselineArtifacts, target: &BaselineArtifacts) -> Option<TypeFinding> {
    let (new_content, conflicts) = merge_field_diffs(&[
        diff_sets(&source.config_keys, &target.config_keys),
        diff_sets(&source.tools, &target.tools),
        diff_sets(&source.versions, &target.versions),
    ]);
    if new_content.is_empty() && conflicts.is_empty() {
        return None;
    }
    let source_total = count(&source.config_keys) + count(&source.tools) + count(&source.versions);
    Some(TypeFinding {
        drift_type: DriftType::Environment,
        confidence: confidence_from_diff(source_total, new_content.len() + conflicts.len()),
        conflicts,
        new_content,
        recommendation: Recommendation::AddNote,
    })
}

fn merge_field_diffs(diffs: &[(Vec<String>, Vec<String>)]) -> (Vec<String>, Vec<String>) {
    let mut new_content = Vec::new();
    let mut conflicts = Vec::new();
    for (n, c) in diffs {
        new_content.extend(n.iter().cloned());
        conflicts.extend(c.iter().cloned());
    }
    (new_content, conflicts)
}

fn count(field: &Option<Vec<String>>) -> usize {
    field.as_ref().map(|v| v.len()).unwrap_or(0)
}

fn check_coverage(source: &BaselineArtifacts, target: &BaselineArtifacts) -> Vec<String> {
    let source_set = to_set(&source.scenarios);
    let target_set = to_set(&target.scenarios);
    let mut gaps: Vec<String> = source_set
        .difference(&target_set)
        .map(|s| s.to_string())
        .collect();
    gaps.sort();
    gaps
}

/// Compares a signal's source evidence against a document's target evidence
/// (§4.3). Tie-breaks competing drift types by `DriftType::priority_rank`,
/// then boosts the winning confidence by the joiner's `confidence_boost` and
/// adjusts it by keyword-hint analysis on `source_text` before clamping.
pub fn compare(
    source: &BaselineArtifacts,
    target: &BaselineArtifacts,
    source_text: &str,
    joiner_confidence_boost: f64,
) -> ComparisonResult {
    let mut findings: Vec<TypeFinding> = [
        check_instruction(source, target),
        check_process(source, target),
        check_ownership(source, target),
        check_environment(source, target),
    ]
    .into_iter()
    .flatten()
    .collect();

    findings.sort_by_key(|f| f.drift_type.priority_rank());

    let coverage_gaps = check_coverage(source, target);
    let has_coverage_gap = !coverage_gaps.is_empty();

    if findings.is_empty() {
        return ComparisonResult {
            drift_type: None,
            confidence: 0.0,
            has_drift: false,
            has_coverage_gap,
            all_drift_types: Vec::new(),
            conflicts: Vec::new(),
            new_content: Vec::new(),
            coverage_gaps,
            recommendation: None,
        };
    }

    let all_drift_types: Vec<DriftType> = findings.iter().map(|f| f.drift_type).collect();
    let winner = findings.into_iter().next().unwrap();

    let max_confidence = winner.confidence;
    let adjustment = keywords::adjustment(winner.drift_type, source_text);
    let confidence = (max_confidence + joiner_confidence_boost + adjustment).clamp(0.0, 1.0);

    ComparisonResult {
        drift_type: Some(winner.drift_type),
        confidence,
        has_drift: true,
        has_coverage_gap,
        all_drift_types,
        conflicts: winner.conflicts,
        new_content: winner.new_content,
        coverage_gaps,
        recommendation: Some(winner.recommendation),
    }
}
