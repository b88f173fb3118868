use super::pack::{DecisionOnFail, MergeStrategy, ParsedPolicyPack};
use crate::error::PolicyError;
use std::collections::HashMap;

/// The resolved obligation outcome for one `ruleId` after merging every
/// applicable pack (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRuleDecision {
    pub rule_id: String,
    pub decision: DecisionOnFail,
    /// Pack ids that contributed an obligation for this rule, in the order
    /// considered — kept for the `priority_conflict` / provenance report.
    pub provenance: Vec<String>,
    pub conflict: Option<String>,
}

struct PackRuleDecision {
    pack_id: String,
    scope_priority: i32,
    decision: DecisionOnFail,
}

/// Merges per-pack rule outcomes for the same `ruleId` across every pack
/// that applied to this candidate. All packs must declare the same
/// `scopeMergeStrategy`; a mix is a hard `merge_strategy_conflict` (§4.4),
/// resolved conservatively here by falling back to `MOST_RESTRICTIVE` with
/// the conflict still attached for operator review rather than aborting
/// evaluation outright.
pub fn merge(
    packs: &[&ParsedPolicyPack],
    rule_decisions: &HashMap<String, Vec<(String, DecisionOnFail)>>,
) -> Result<Vec<MergedRuleDecision>, PolicyError> {
    let strategies: Vec<MergeStrategy> = packs
        .iter()
        .map(|p| p.metadata.scope_merge_strategy)
        .collect();
    let distinct: Vec<MergeStrategy> = {
        let mut d = strategies.clone();
        d.dedup();
        d
    };

    let (strategy, strategy_conflict) = if distinct.len() > 1 {
        (MergeStrategy::MostRestrictive, Some(format!(
            "packs disagree on scopeMergeStrategy: {:?}",
            distinct
        )))
    } else if distinct.first() == Some(&MergeStrategy::Explicit) && packs.len() > 1 {
        (MergeStrategy::Explicit, None)
    } else {
        (distinct.first().copied().unwrap_or(MergeStrategy::MostRestrictive), None)
    };

    if strategy == MergeStrategy::Explicit && strategy_conflict.is_none() {
        let mut seen_rules = std::collections::HashSet::new();
        for (rule_id, decisions) in rule_decisions {
            if decisions.len() > 1 && !seen_rules.insert(rule_id.clone()) {
                return Err(PolicyError::MergeStrategyConflict(format!(
                    "rule {rule_id} has obligations from multiple packs under EXPLICIT strategy"
                )));
            }
        }
    }

    let priority_by_pack: HashMap<&str, i32> = packs
        .iter()
        .map(|p| (p.metadata.id.as_str(), p.metadata.scope_priority))
        .collect();

    let mut merged = Vec::new();
    for (rule_id, decisions) in rule_decisions {
        let per_pack: Vec<PackRuleDecision> = decisions
            .iter()
            .map(|(pack_id, decision)| PackRuleDecision {
                pack_id: pack_id.clone(),
                scope_priority: *priority_by_pack.get(pack_id.as_str()).unwrap_or(&0),
                decision: *decision,
            })
            .collect();

        let provenance: Vec<String> = per_pack.iter().map(|d| d.pack_id.clone()).collect();

        let (decision, conflict) = match strategy {
            MergeStrategy::MostRestrictive => {
                let most_restrictive = per_pack
                    .iter()
                    .map(|d| d.decision)
                    .max()
                    .unwrap_or(DecisionOnFail::Pass);
                (most_restrictive, strategy_conflict.clone())
            }
            MergeStrategy::HighestPriority => {
                let max_priority = per_pack.iter().map(|d| d.scope_priority).max().unwrap_or(0);
                let at_max: Vec<&PackRuleDecision> = per_pack
                    .iter()
                    .filter(|d| d.scope_priority == max_priority)
                    .collect();
                if at_max.len() > 1 {
                    (
                        at_max[0].decision,
                        Some(format!("priority_conflict on rule {rule_id}: packs {:?} tie at priority {max_priority}", at_max.iter().map(|d| &d.pack_id).collect::<Vec<_>>())),
                    )
                } else {
                    (at_max.first().map(|d| d.decision).unwrap_or(DecisionOnFail::Pass), None)
                }
            }
            MergeStrategy::Explicit => {
                (per_pack.first().map(|d| d.decision).unwrap_or(DecisionOnFail::Pass), None)
            }
        };

        merged.push(MergedRuleDecision {
            rule_id: rule_id.clone(),
            decision,
            provenance,
            conflict,
        });
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::pack::PackMetadata;

    fn pack(id: &str, priority: i32, strategy: MergeStrategy) -> ParsedPolicyPack {
        ParsedPolicyPack {
            metadata: PackMetadata {
                id: id.to_string(),
                name: id.to_string(),
                version: "1".to_string(),
                scope_priority: priority,
                scope_merge_strategy: strategy,
                tags: vec![],
            },
            scope: Default::default(),
            rules: vec![],
            evaluation: Default::default(),
        }
    }

    #[test]
    fn most_restrictive_picks_block_over_warn() {
        let a = pack("a", 1, MergeStrategy::MostRestrictive);
        let b = pack("b", 1, MergeStrategy::MostRestrictive);
        let packs = vec![&a, &b];
        let mut decisions = HashMap::new();
        decisions.insert(
            "rule-1".to_string(),
            vec![
                ("a".to_string(), DecisionOnFail::Warn),
                ("b".to_string(), DecisionOnFail::Block),
            ],
        );
        let merged = merge(&packs, &decisions).unwrap();
        assert_eq!(merged[0].decision, DecisionOnFail::Block);
    }

    #[test]
    fn highest_priority_wins_on_tie_free_priorities() {
        let a = pack("a", 1, MergeStrategy::HighestPriority);
        let b = pack("b", 2, MergeStrategy::HighestPriority);
        let packs = vec![&a, &b];
        let mut decisions = HashMap::new();
        decisions.insert(
            "rule-1".to_string(),
            vec![
                ("a".to_string(), DecisionOnFail::Block),
                ("b".to_string(), DecisionOnFail::Pass),
            ],
        );
        let merged = merge(&packs, &decisions).unwrap();
        assert_eq!(merged[0].decision, DecisionOnFail::Pass);
        assert!(merged[0].conflict.is_none());
    }

    #[test]
    fn highest_priority_tie_reports_a_conflict() {
        let a = pack("a", 1, MergeStrategy::HighestPriority);
        let b = pack("b", 1, MergeStrategy::HighestPriority);
        let packs = vec![&a, &b];
        let mut decisions = HashMap::new();
        decisions.insert(
            "rule-1".to_string(),
            vec![
                ("a".to_string(), DecisionOnFail::Block),
                ("b".to_string(), DecisionOnFail::Pass),
            ],
        );
        let merged = merge(&packs, &decisions).unwrap();
        assert!(merged[0].conflict.is_some());
    }

    #[test]
    fn mixed_strategies_fall_back_to_most_restrictive_with_conflict_noted() {
        let a = pack("a", 1, MergeStrategy::Explicit);
        let b = pack("b", 1, MergeStrategy::MostRestrictive);
        let packs = vec![&a, &b];
        let mut decisions = HashMap::new();
        decisions.insert(
            "rule-1".to_string(),
            vec![
                ("a".to_string(), DecisionOnFail::Warn),
                ("b".to_string(), DecisionOnFail::Block),
            ],
        );
        let merged = merge(&packs, &decisions).unwrap();
        assert_eq!(merged[0].decision, DecisionOnFail::Block);
        assert!(merged[0].conflict.is_some());
    }
}
