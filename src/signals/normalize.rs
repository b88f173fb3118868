use super::raw::{
    RawAlert, RawCodeownersChange, RawGithubPr, RawPagerdutyIncident, RawSlackCluster,
};
use crate::domain::signal_event::{
    ChangeStatus, ChangedFile, ExtractedPayload, SignalEvent, SourceType,
};
use crate::error::SchemaError;
use chrono::Utc;

fn parse_change_status(raw: &str) -> ChangeStatus {
    match raw {
        "added" => ChangeStatus::Added,
        "removed" => ChangeStatus::Removed,
        "renamed" => ChangeStatus::Renamed,
        _ => ChangeStatus::Modified,
    }
}

fn convert_changed_files(raw: &[super::raw::RawChangedFile]) -> Vec<ChangedFile> {
    raw.iter()
        .map(|f| ChangedFile {
            path: f.path.clone(),
            status: parse_change_status(&f.status),
            additions: f.additions,
            deletions: f.deletions,
        })
        .collect()
}

/// Normalize a `github_pr` webhook into a canonical `SignalEvent` (§4.2,
/// §6.1). Same webhook also produces `github_iac` / `github_codeowners`
/// signals when the diff matches IaC or CODEOWNERS patterns — that
/// branching happens one layer up, in the webhook router, which is out of
/// scope for the core (§1).
pub fn normalize_github_pr(workspace_id: &str, raw: RawGithubPr) -> Result<SignalEvent, SchemaError> {
    let changed_files = convert_changed_files(&raw.pull_request.changed_files);
    let total_changes: u32 = changed_files.iter().map(|f| f.additions + f.deletions).sum();

    let id = SignalEvent::derive_id(
        SourceType::GithubPr,
        &[
            &raw.repository.owner_login,
            &raw.repository.name,
            &raw.pull_request.number.to_string(),
        ],
    );

    let extracted = ExtractedPayload::GithubPr {
        merged: raw.pull_request.merged,
        changed_files,
        total_changes,
        diff: raw.pull_request.diff,
        pr_number: raw.pull_request.number,
        pr_title: raw.pull_request.title,
        pr_body: raw.pull_request.body,
        author: raw.pull_request.user_login,
        base_ref: raw.pull_request.base_ref,
        head_ref: raw.pull_request.head_ref,
        head_sha: raw.pull_request.head_sha,
    };

    super::validate::validate_required_fields(&extracted)?;

    Ok(SignalEvent {
        workspace_id: workspace_id.to_string(),
        id,
        source_type: SourceType::GithubPr,
        occurred_at: Utc::now(),
        service: None,
        repo: Some(raw.repository.full_name),
        severity: None,
        extracted,
        raw_payload: serde_json::Value::Null,
    })
}

pub fn normalize_pagerduty_incident(
    workspace_id: &str,
    raw: RawPagerdutyIncident,
) -> Result<SignalEvent, SchemaError> {
    let id = SignalEvent::derive_id(SourceType::PagerdutyIncident, &[&raw.incident_id]);

    let extracted = ExtractedPayload::PagerdutyIncident {
        status: raw.status,
        service: raw.service.clone(),
        responders: raw.responders,
        timeline: raw
            .timeline
            .into_iter()
            .map(|t| crate::domain::signal_event::TimelineEntry {
                at: t.at,
                description: t.description,
            })
            .collect(),
        escalation_policy: raw.escalation_policy,
        teams: raw.teams,
        priority: raw.priority.clone(),
    };

    super::validate::validate_required_fields(&extracted)?;

    Ok(SignalEvent {
        workspace_id: workspace_id.to_string(),
        id,
        source_type: SourceType::PagerdutyIncident,
        occurred_at: Utc::now(),
        service: Some(raw.service),
        repo: None,
        severity: raw.priority,
        extracted,
        raw_payload: serde_json::Value::Null,
    })
}

pub fn normalize_slack_cluster(
    workspace_id: &str,
    raw: RawSlackCluster,
) -> Result<SignalEvent, SchemaError> {
    let hash_input = format!("{}:{}", raw.channel, raw.representative_question);
    let hash = crate::fingerprint::hash_tokens(&[&hash_input]);
    let id = SignalEvent::derive_id(SourceType::SlackCluster, &[&hash]);

    let mut questions = vec![raw.representative_question.clone()];
    questions.extend(raw.samples.clone());

    let extracted = ExtractedPayload::SlackCluster {
        cluster_size: raw.message_count,
        unique_askers: raw.unique_askers,
        questions,
        messages: raw.samples,
        channel: raw.channel.clone(),
    };

    super::validate::validate_required_fields(&extracted)?;

    Ok(SignalEvent {
        workspace_id: workspace_id.to_string(),
        id,
        source_type: SourceType::SlackCluster,
        occurred_at: raw.last_seen,
        service: None,
        repo: None,
        severity: None,
        extracted,
        raw_payload: serde_json::Value::Null,
    })
}

pub fn normalize_alert(
    workspace_id: &str,
    raw: RawAlert,
    is_grafana: bool,
) -> Result<SignalEvent, SchemaError> {
    let source_type = if is_grafana {
        SourceType::GrafanaAlert
    } else {
        SourceType::DatadogAlert
    };
    let id = SignalEvent::derive_id(source_type, &[&raw.alert_id]);

    let extracted = if is_grafana {
        ExtractedPayload::GrafanaAlert {
            monitor_name: raw.monitor_name.clone(),
            severity: raw.severity.clone(),
            alert_type: raw.alert_type,
            tags: raw.tags,
            alert_id: raw.alert_id,
            alert_url: raw.alert_url,
        }
    } else {
        ExtractedPayload::DatadogAlert {
            monitor_name: raw.monitor_name.clone(),
            severity: raw.severity.clone(),
            alert_type: raw.alert_type,
            tags: raw.tags,
            alert_id: raw.alert_id,
            alert_url: raw.alert_url,
            metric: raw.metric,
            threshold: raw.threshold,
            current_value: raw.current_value,
        }
    };

    super::validate::validate_required_fields(&extracted)?;

    Ok(SignalEvent {
        workspace_id: workspace_id.to_string(),
        id,
        source_type,
        occurred_at: Utc::now(),
        service: None,
        repo: None,
        severity: Some(raw.severity),
        extracted,
        raw_payload: serde_json::Value::Null,
    })
}

pub fn normalize_codeowners_change(
    workspace_id: &str,
    raw: RawCodeownersChange,
) -> Result<SignalEvent, SchemaError> {
    let id = SignalEvent::derive_id(
        SourceType::GithubCodeowners,
        &[
            &raw.repository.owner_login,
            &raw.repository.name,
            &raw.pr_number.to_string(),
        ],
    );

    let extracted = ExtractedPayload::GithubCodeowners {
        changed_paths: raw.changed_paths,
        diff: raw.diff,
        pr_number: raw.pr_number,
    };

    super::validate::validate_required_fields(&extracted)?;

    Ok(SignalEvent {
        workspace_id: workspace_id.to_string(),
        id,
        source_type: SourceType::GithubCodeowners,
        occurred_at: Utc::now(),
        service: None,
        repo: Some(raw.repository.full_name),
        severity: None,
        extracted,
        raw_payload: serde_json::Value::Null,
    })
}

/// Dispatch entry point used by the queue consumer: source type is already
/// known from the webhook route, so callers normalize directly through the
/// per-source functions above. This wrapper exists for call sites (tests,
/// the state machine's `Ingested` handler) that already hold a raw
/// `serde_json::Value` tagged by source.
pub fn normalize(
    workspace_id: &str,
    source_type: SourceType,
    raw: serde_json::Value,
) -> Result<SignalEvent, SchemaError> {
    match source_type {
        SourceType::GithubPr => {
            let raw: RawGithubPr = serde_json::from_value(raw).map_err(|e| {
                SchemaError::MissingRequiredField {
                    source_type: "github_pr".to_string(),
                    field: e.to_string(),
                }
            })?;
            normalize_github_pr(workspace_id, raw)
        }
        SourceType::PagerdutyIncident => {
            let raw: RawPagerdutyIncident = serde_json::from_value(raw).map_err(|e| {
                SchemaError::MissingRequiredField {
                    source_type: "pagerduty_incident".to_string(),
                    field: e.to_string(),
                }
            })?;
            normalize_pagerduty_incident(workspace_id, raw)
        }
        SourceType::SlackCluster => {
            let raw: RawSlackCluster = serde_json::from_value(raw).map_err(|e| {
                SchemaError::MissingRequiredField {
                    source_type: "slack_cluster".to_string(),
                    field: e.to_string(),
                }
            })?;
            normalize_slack_cluster(workspace_id, raw)
        }
        SourceType::DatadogAlert | SourceType::GrafanaAlert => {
            let is_grafana = source_type == SourceType::GrafanaAlert;
            let raw: RawAlert = serde_json::from_value(raw).map_err(|e| {
                SchemaError::MissingRequiredField {
                    source_type: "datadog_alert".to_string(),
                    field: e.to_string(),
                }
            })?;
            normalize_alert(workspace_id, raw, is_grafana)
        }
        SourceType::GithubIac => {
            let raw: RawGithubPr = serde_json::from_value(raw).map_err(|e| {
                SchemaError::MissingRequiredField {
                    source_type: "github_iac".to_string(),
                    field: e.to_string(),
                }
            })?;
            let changed_files = convert_changed_files(&raw.pull_request.changed_files);
            let id = SignalEvent::derive_id(
                SourceType::GithubIac,
                &[
                    &raw.repository.owner_login,
                    &raw.repository.name,
                    &raw.pull_request.number.to_string(),
                ],
            );
            let extracted = ExtractedPayload::GithubIac {
                changed_files,
                diff: raw.pull_request.diff,
                pr_number: raw.pull_request.number,
            };
            super::validate::validate_required_fields(&extracted)?;
            Ok(SignalEvent {
                workspace_id: workspace_id.to_string(),
                id,
                source_type: SourceType::GithubIac,
                occurred_at: Utc::now(),
                service: None,
                repo: Some(raw.repository.full_name),
                severity: None,
                extracted,
                raw_payload: serde_json::Value::Null,
            })
        }
        SourceType::GithubCodeowners => {
            let raw: RawCodeownersChange = serde_json::from_value(raw).map_err(|e| {
                SchemaError::MissingRequiredField {
                    source_type: "github_codeowners".to_string(),
                    field: e.to_string(),
                }
            })?;
            normalize_codeowners_change(workspace_id, raw)
        }
    }
}
