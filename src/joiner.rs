use crate::domain::signal_event::{SignalEvent, SourceType};
use chrono::{DateTime, Utc};

pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Result of correlating a signal against its neighbors in the time window
/// (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult {
    pub correlated_signal_ids: Vec<String>,
    pub is_multi_source: bool,
    pub confidence_boost: f64,
}

/// Relevance decays linearly to zero at `window_hours` apart; signals
/// exactly at the boundary or beyond are excluded by the caller.
pub fn relevance(hours_apart: f64, window_hours: f64) -> f64 {
    (1.0 - hours_apart / window_hours).max(0.0)
}

/// Scans `candidates` (already filtered to the same `service` by the
/// caller) for signals within the window of `subject`, and computes the
/// confidence boost per §4.6: `+0.15` for a `github_pr` / `pagerduty_incident`
/// co-occurrence, `+0.10` for >= 3 related signals, `+0.05` for >= 1,
/// boosts do not stack beyond the highest-tier rule that applies.
pub fn join(
    subject: &SignalEvent,
    candidates: &[SignalEvent],
    window_days: i64,
) -> JoinResult {
    let window_hours = (window_days * 24) as f64;
    let related: Vec<&SignalEvent> = candidates
        .iter()
        .filter(|c| c.id != subject.id)
        .filter(|c| c.service.is_some() && c.service == subject.service)
        .filter(|c| hours_between(subject.occurred_at, c.occurred_at).abs() < window_hours)
        .collect();

    let source_types: std::collections::HashSet<SourceType> =
        related.iter().map(|c| c.source_type).collect();
    let has_pr_incident_pair = (subject.source_type == SourceType::GithubPr
        || source_types.contains(&SourceType::GithubPr))
        && (subject.source_type == SourceType::PagerdutyIncident
            || source_types.contains(&SourceType::PagerdutyIncident));

    let confidence_boost = if has_pr_incident_pair {
        0.15
    } else if related.len() >= 3 {
        0.10
    } else if !related.is_empty() {
        0.05
    } else {
        0.0
    };

    let mut all_source_types = source_types.clone();
    all_source_types.insert(subject.source_type);

    JoinResult {
        correlated_signal_ids: related.iter().map(|c| c.id.clone()).collect(),
        is_multi_source: all_source_types.len() > 1,
        confidence_boost,
    }
}

fn hours_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    (b - a).num_seconds() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal_event::ExtractedPayload;
    use chrono::Duration;

    fn pr_signal(id: &str, service: &str, occurred_at: DateTime<Utc>) -> SignalEvent {
        SignalEvent {
            workspace_id: "ws".into(),
            id: id.into(),
            source_type: SourceType::GithubPr,
            occurred_at,
            service: Some(service.into()),
            repo: Some("acme/web".into()),
            severity: None,
            extracted: ExtractedPayload::GithubPr {
                merged: true,
                changed_files: vec![],
                total_changes: 0,
                diff: String::new(),
                pr_number: 1,
                pr_title: "t".into(),
                pr_body: None,
                author: "a".into(),
                base_ref: "main".into(),
                head_ref: "f".into(),
                head_sha: "abc".into(),
            },
            raw_payload: serde_json::Value::Null,
        }
    }

    fn incident_signal(id: &str, service: &str, occurred_at: DateTime<Utc>) -> SignalEvent {
        SignalEvent {
            workspace_id: "ws".into(),
            id: id.into(),
            source_type: SourceType::PagerdutyIncident,
            occurred_at,
            service: Some(service.into()),
            repo: None,
            severity: None,
            extracted: ExtractedPayload::PagerdutyIncident {
                status: "resolved".into(),
                service: service.into(),
                responders: vec!["a".into()],
                timeline: vec![],
                escalation_policy: "ep".into(),
                teams: vec!["t".into()],
                priority: None,
            },
            raw_payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn pr_and_incident_cooccurrence_boosts_by_point_one_five() {
        let now = Utc::now();
        let subject = pr_signal("pr-1", "checkout", now);
        let incident = incident_signal("inc-1", "checkout", now - Duration::hours(2));
        let result = join(&subject, &[incident], DEFAULT_WINDOW_DAYS);
        assert_eq!(result.confidence_boost, 0.15);
        assert!(result.is_multi_source);
    }

    #[test]
    fn signals_outside_the_window_are_excluded() {
        let now = Utc::now();
        let subject = pr_signal("pr-1", "checkout", now);
        let far = incident_signal("inc-1", "checkout", now - Duration::days(30));
        let result = join(&subject, &[far], DEFAULT_WINDOW_DAYS);
        assert_eq!(result.confidence_boost, 0.0);
        assert!(result.correlated_signal_ids.is_empty());
    }

    #[test]
    fn relevance_decays_to_zero_at_the_window_edge() {
        assert_eq!(relevance(0.0, 168.0), 1.0);
        assert_eq!(relevance(168.0, 168.0), 0.0);
        assert_eq!(relevance(200.0, 168.0), 0.0);
    }
}
