use super::comparators::ComparisonContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supported condition operators (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    In,
    Contains,
    ContainsAll,
    Matches,
    StartsWith,
    EndsWith,
}

/// A fact-based condition, or a boolean composition of them (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Leaf {
        fact: String,
        operator: Operator,
        value: Value,
    },
    And {
        and: Vec<Condition>,
    },
    Or {
        or: Vec<Condition>,
    },
    Not {
        not: Box<Condition>,
    },
}

pub fn evaluate(condition: &Condition, ctx: &ComparisonContext) -> bool {
    match condition {
        Condition::Leaf {
            fact,
            operator,
            value,
        } => {
            let actual = ctx.get(fact);
            evaluate_leaf(actual, *operator, value)
        }
        Condition::And { and } => and.iter().all(|c| evaluate(c, ctx)),
        Condition::Or { or } => or.iter().any(|c| evaluate(c, ctx)),
        Condition::Not { not } => !evaluate(not, ctx),
    }
}

fn evaluate_leaf(actual: Option<&Value>, operator: Operator, expected: &Value) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    match operator {
        Operator::Eq => actual == expected,
        Operator::Ne => actual != expected,
        Operator::Gt => compare_numbers(actual, expected, |a, b| a > b),
        Operator::Ge => compare_numbers(actual, expected, |a, b| a >= b),
        Operator::Lt => compare_numbers(actual, expected, |a, b| a < b),
        Operator::Le => compare_numbers(actual, expected, |a, b| a <= b),
        Operator::In => expected
            .as_array()
            .map(|arr| arr.contains(actual))
            .unwrap_or(false),
        Operator::Contains => match actual {
            Value::Array(arr) => arr.contains(expected),
            Value::String(s) => expected.as_str().map(|e| s.contains(e)).unwrap_or(false),
            _ => false,
        },
        Operator::ContainsAll => match (actual, expected.as_array()) {
            (Value::Array(arr), Some(expected_items)) => {
                expected_items.iter().all(|e| arr.contains(e))
            }
            _ => false,
        },
        Operator::Matches => {
            let (Some(s), Some(pattern)) = (actual.as_str(), expected.as_str()) else {
                return false;
            };
            regex::Regex::new(pattern)
                .map(|re| re.is_match(s))
                .unwrap_or(false)
        }
        Operator::StartsWith => {
            let (Some(s), Some(prefix)) = (actual.as_str(), expected.as_str()) else {
                return false;
            };
            s.starts_with(prefix)
        }
        Operator::EndsWith => {
            let (Some(s), Some(suffix)) = (actual.as_str(), expected.as_str()) else {
                return false;
            };
            s.ends_with(suffix)
        }
    }
}

fn compare_numbers(actual: &Value, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(key: &str, value: Value) -> ComparisonContext {
        let mut ctx = ComparisonContext::default();
        ctx.facts.insert(key.to_string(), value);
        ctx
    }

    #[test]
    fn eq_operator_matches_equal_values() {
        let ctx = ctx_with("actor.user", json!("bot"));
        let cond = Condition::Leaf {
            fact: "actor.user".into(),
            operator: Operator::Eq,
            value: json!("bot"),
        };
        assert!(evaluate(&cond, &ctx));
    }

    #[test]
    fn and_requires_all_conditions() {
        let ctx = ctx_with("pr.approvals.count", json!(2));
        let cond = Condition::And {
            and: vec![
                Condition::Leaf {
                    fact: "pr.approvals.count".into(),
                    operator: Operator::Ge,
                    value: json!(1),
                },
                Condition::Leaf {
                    fact: "pr.approvals.count".into(),
                    operator: Operator::Lt,
                    value: json!(1),
                },
            ],
        };
        assert!(!evaluate(&cond, &ctx));
    }

    #[test]
    fn not_negates_the_inner_condition() {
        let ctx = ctx_with("diff.filesChanged.paths", json!(["a.rs"]));
        let cond = Condition::Not {
            not: Box::new(Condition::Leaf {
                fact: "diff.filesChanged.paths".into(),
                operator: Operator::Contains,
                value: json!("b.rs"),
            }),
        };
        assert!(evaluate(&cond, &ctx));
    }

    #[test]
    fn missing_fact_evaluates_leaf_to_false() {
        let ctx = ComparisonContext::default();
        let cond = Condition::Leaf {
            fact: "nope".into(),
            operator: Operator::Eq,
            value: json!(true),
        };
        assert!(!evaluate(&cond, &ctx));
    }
}
