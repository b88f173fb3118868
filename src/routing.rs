use crate::domain::workspace::{ConfidenceBand, Workspace};
use chrono::{DateTime, Utc};

pub const RATE_CAP_PER_HOUR: u32 = 10;
pub const RATE_CAP_WINDOW_MINUTES: i64 = 60;

/// Domains that always escalate to P0 regardless of confidence band (§4.6).
const CRITICAL_DOMAINS: &[&str] = &["deployment", "rollback", "auth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    P0,
    P1,
    P2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingTarget {
    DirectMessage { owner_slack_id: String },
    TeamChannel,
    DigestDelayed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub priority: Priority,
    pub target: RoutingTarget,
    pub rate_limited: bool,
}

/// True when `domain` or `risk_level == "high"` forces escalation past the
/// confidence band (§4.6).
pub fn is_critical(domain: Option<&str>, risk_level: Option<&str>) -> bool {
    domain.is_some_and(|d| CRITICAL_DOMAINS.contains(&d))
        || risk_level == Some("high")
}

/// Given a workspace's thresholds, a candidate's confidence, optional owner
/// and domain/risk signals, and the count of notifications already sent in
/// the current rolling window, decides where and how urgently to route
/// (§4.6). When the rate cap is exceeded, the decision downgrades to
/// digest-only rather than dropping the notification, unless `is_critical`
/// forces escalation through.
pub fn route(
    workspace: &Workspace,
    confidence: f64,
    owner_slack_id: Option<&str>,
    domain: Option<&str>,
    risk_level: Option<&str>,
    notifications_in_window: u32,
) -> RoutingDecision {
    let escalate = is_critical(domain, risk_level);
    let band = workspace.confidence_band(confidence);

    let (priority, mut target) = if escalate {
        (
            Priority::P0,
            match owner_slack_id {
                Some(id) => RoutingTarget::DirectMessage {
                    owner_slack_id: id.to_string(),
                },
                None => RoutingTarget::TeamChannel,
            },
        )
    } else {
        match band {
            ConfidenceBand::High => (
                Priority::P0,
                match owner_slack_id {
                    Some(id) => RoutingTarget::DirectMessage {
                        owner_slack_id: id.to_string(),
                    },
                    None => RoutingTarget::TeamChannel,
                },
            ),
            ConfidenceBand::Medium => (Priority::P1, RoutingTarget::TeamChannel),
            ConfidenceBand::Low => (Priority::P2, RoutingTarget::DigestDelayed),
        }
    };

    let rate_limited = !escalate && notifications_in_window >= RATE_CAP_PER_HOUR;
    if rate_limited {
        target = RoutingTarget::DigestDelayed;
    }

    RoutingDecision {
        priority,
        target,
        rate_limited,
    }
}

/// Count of notification timestamps falling within the rolling window ending
/// at `now` — used by callers to compute `notifications_in_window` from a
/// persisted log before calling `route`.
pub fn count_in_window(sent_at: &[DateTime<Utc>], now: DateTime<Utc>) -> u32 {
    sent_at
        .iter()
        .filter(|t| (now - **t).num_minutes() < RATE_CAP_WINDOW_MINUTES && **t <= now)
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn high_confidence_routes_direct_message_at_p0() {
        let ws = Workspace::new("acme", "Acme", "cred-1");
        let decision = route(&ws, 0.9, Some("U123"), None, None, 0);
        assert_eq!(decision.priority, Priority::P0);
        assert_eq!(
            decision.target,
            RoutingTarget::DirectMessage {
                owner_slack_id: "U123".to_string()
            }
        );
    }

    #[test]
    fn low_confidence_in_critical_domain_still_escalates() {
        let ws = Workspace::new("acme", "Acme", "cred-1");
        let decision = route(&ws, 0.1, None, Some("auth"), None, 0);
        assert_eq!(decision.priority, Priority::P0);
    }

    #[test]
    fn rate_cap_downgrades_to_digest_once_exceeded() {
        let ws = Workspace::new("acme", "Acme", "cred-1");
        let decision = route(&ws, 0.9, Some("U123"), None, None, RATE_CAP_PER_HOUR);
        assert!(decision.rate_limited);
        assert_eq!(decision.target, RoutingTarget::DigestDelayed);
    }

    #[test]
    fn critical_domain_ignores_the_rate_cap() {
        let ws = Workspace::new("acme", "Acme", "cred-1");
        let decision = route(&ws, 0.1, None, Some("deployment"), None, RATE_CAP_PER_HOUR);
        assert!(!decision.rate_limited);
        assert_eq!(decision.priority, Priority::P0);
    }

    #[test]
    fn count_in_window_excludes_entries_older_than_sixty_minutes() {
        let now = Utc::now();
        let sent = vec![now - Duration::minutes(30), now - Duration::minutes(90)];
        assert_eq!(count_in_window(&sent, now), 1);
    }
}
