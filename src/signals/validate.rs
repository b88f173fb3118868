use crate::domain::signal_event::ExtractedPayload;
use crate::error::SchemaError;

/// Enforces the per-source required-field sets from §4.2. This runs after
/// normalization even though normalization already built a typed payload,
/// because a typed Rust field can still be semantically empty (an empty
/// `changedFiles` on a PR, a `clusterSize` below the minimum) in a way the
/// type system can't reject at construction.
pub fn validate_required_fields(payload: &ExtractedPayload) -> Result<(), SchemaError> {
    match payload {
        ExtractedPayload::GithubPr { changed_files, .. } => {
            if changed_files.is_empty() {
                return Err(missing("github_pr", "changedFiles"));
            }
            Ok(())
        }
        ExtractedPayload::PagerdutyIncident {
            responders,
            timeline,
            teams,
            ..
        } => {
            if responders.is_empty() {
                return Err(missing("pagerduty_incident", "responders"));
            }
            if timeline.is_empty() {
                return Err(missing("pagerduty_incident", "timeline"));
            }
            if teams.is_empty() {
                return Err(missing("pagerduty_incident", "teams"));
            }
            Ok(())
        }
        ExtractedPayload::SlackCluster {
            cluster_size,
            unique_askers,
            questions,
            messages,
            ..
        } => {
            if *cluster_size < 2 {
                return Err(missing("slack_cluster", "clusterSize>=2"));
            }
            if *unique_askers < 2 {
                return Err(missing("slack_cluster", "uniqueAskers>=2"));
            }
            if questions.is_empty() {
                return Err(missing("slack_cluster", "questions"));
            }
            if messages.is_empty() {
                return Err(missing("slack_cluster", "messages"));
            }
            Ok(())
        }
        ExtractedPayload::DatadogAlert {
            monitor_name, tags, ..
        }
        | ExtractedPayload::GrafanaAlert {
            monitor_name, tags, ..
        } => {
            if monitor_name.is_empty() {
                return Err(missing("datadog_alert", "monitorName"));
            }
            if tags.is_empty() {
                return Err(missing("datadog_alert", "tags"));
            }
            Ok(())
        }
        ExtractedPayload::GithubIac { changed_files, .. } => {
            if changed_files.is_empty() {
                return Err(missing("github_iac", "changedFiles"));
            }
            Ok(())
        }
        ExtractedPayload::GithubCodeowners { changed_paths, .. } => {
            if changed_paths.is_empty() {
                return Err(missing("github_codeowners", "changedPaths"));
            }
            Ok(())
        }
    }
}

fn missing(source_type: &str, field: &str) -> SchemaError {
    SchemaError::MissingRequiredField {
        source_type: source_type.to_string(),
        field: field.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::signal_event::{ChangeStatus, ChangedFile};

    #[test]
    fn github_pr_with_no_changed_files_fails_validation() {
        let payload = ExtractedPayload::GithubPr {
            merged: true,
            changed_files: vec![],
            total_changes: 0,
            diff: String::new(),
            pr_number: 1,
            pr_title: "t".into(),
            pr_body: None,
            author: "a".into(),
            base_ref: "main".into(),
            head_ref: "feature".into(),
            head_sha: "abc".into(),
        };
        assert!(validate_required_fields(&payload).is_err());
    }

    #[test]
    fn github_pr_with_changed_files_passes() {
        let payload = ExtractedPayload::GithubPr {
            merged: true,
            changed_files: vec![ChangedFile {
                path: "a.rs".into(),
                status: ChangeStatus::Modified,
                additions: 1,
                deletions: 0,
            }],
            total_changes: 1,
            diff: "diff".into(),
            pr_number: 1,
            pr_title: "t".into(),
            pr_body: None,
            author: "a".into(),
            base_ref: "main".into(),
            head_ref: "feature".into(),
            head_sha: "abc".into(),
        };
        assert!(validate_required_fields(&payload).is_ok());
    }

    #[test]
    fn slack_cluster_below_minimum_size_fails() {
        let payload = ExtractedPayload::SlackCluster {
            cluster_size: 1,
            unique_askers: 1,
            questions: vec!["q".into()],
            messages: vec!["m".into()],
            channel: "#support".into(),
        };
        assert!(validate_required_fields(&payload).is_err());
    }
}
