use super::BaselineArtifacts;
use crate::domain::signal_event::{ExtractedPayload, SignalEvent};
use regex::Regex;
use std::sync::LazyLock;

/// Regex families used for deterministic, pattern-based extraction (§4.2).
/// Built once; the `regex` crate's automaton is inherently non-backtracking,
/// which happens to satisfy the same safety requirement the policy
/// evaluator imposes on user-supplied secret patterns (§4.4) for free.
static COMMAND_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\$\s*(.+)$").unwrap());
static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9_]{2,}\b").unwrap());
static ROUTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:GET|POST|PUT|PATCH|DELETE)\s+(/[\w/:{}\-]*)").unwrap());
static DECORATOR_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@\w+\(\s*['"](/[\w/:{}\-]*)['"]"#).unwrap());
static TOOL_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(kubectl|helm|docker|podman|terraform|pulumi|ansible|jenkins|circleci)\b").unwrap()
});

const TOOL_ALIASES: &[(&str, &str)] = &[
    ("kubectl", "k8s_tool"),
    ("helm", "k8s_tool"),
    ("docker", "container_tool"),
    ("podman", "container_tool"),
];

fn canonicalize_tool(tool: &str) -> String {
    TOOL_ALIASES
        .iter()
        .find(|(name, _)| *name == tool)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| tool.to_string())
}

fn dedup(mut v: Vec<String>) -> Option<Vec<String>> {
    v.sort();
    v.dedup();
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

/// Extract artifacts from a chunk of free text (a diff, a document body, an
/// incident timeline entry). Shared by both source-evidence and
/// target-evidence extraction so the comparison engine (§4.3) compares like
/// with like.
pub fn extract_from_text(text: &str) -> BaselineArtifacts {
    let commands = dedup(
        COMMAND_LINE
            .captures_iter(text)
            .map(|c| c[1].trim().to_string())
            .collect(),
    );
    let config_keys = dedup(
        ENV_VAR
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect(),
    );
    let endpoints = dedup(
        ROUTE_PATTERN
            .captures_iter(text)
            .chain(DECORATOR_PATH.captures_iter(text))
            .map(|c| c[1].to_string())
            .collect(),
    );
    let tools = dedup(
        TOOL_NAMES
            .find_iter(text)
            .map(|m| canonicalize_tool(m.as_str()))
            .collect(),
    );

    BaselineArtifacts {
        commands,
        config_keys,
        endpoints,
        tools,
        ..Default::default()
    }
}

/// Extract source-side artifacts from a normalized signal, combining
/// text-pattern extraction with fields the normalizer already typed.
pub fn extract_from_signal(signal: &SignalEvent) -> BaselineArtifacts {
    match &signal.extracted {
        ExtractedPayload::GithubPr { diff, changed_files, .. }
        | ExtractedPayload::GithubIac { diff, changed_files, .. } => {
            let mut artifacts = extract_from_text(diff);
            artifacts.paths = dedup(changed_files.iter().map(|f| f.path.clone()).collect());
            artifacts
        }
        ExtractedPayload::GithubCodeowners { changed_paths, diff, .. } => {
            let mut artifacts = extract_from_text(diff);
            artifacts.paths = dedup(changed_paths.clone());
            artifacts
        }
        ExtractedPayload::PagerdutyIncident {
            timeline,
            teams,
            responders,
            ..
        } => {
            let steps = dedup(timeline.iter().map(|t| t.description.clone()).collect());
            BaselineArtifacts {
                steps,
                teams: dedup(teams.clone()),
                owners: dedup(responders.clone()),
                ..Default::default()
            }
        }
        ExtractedPayload::SlackCluster { questions, channel, .. } => BaselineArtifacts {
            scenarios: dedup(questions.clone()),
            channels: dedup(vec![channel.clone()]),
            ..Default::default()
        },
        ExtractedPayload::DatadogAlert { tags, monitor_name, .. }
        | ExtractedPayload::GrafanaAlert { tags, monitor_name, .. } => BaselineArtifacts {
            features: dedup(vec![monitor_name.clone()]),
            platforms: dedup(tags.clone()),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_command_lines_and_tools() {
        let text = "Run the deploy:\n$ kubectl apply -f deploy.yaml\nThen check DOCKER_HOST.";
        let artifacts = extract_from_text(text);
        assert_eq!(
            artifacts.tools,
            Some(vec!["k8s_tool".to_string()])
        );
        assert_eq!(
            artifacts.commands,
            Some(vec!["kubectl apply -f deploy.yaml".to_string()])
        );
        assert!(artifacts
            .config_keys
            .unwrap()
            .contains(&"DOCKER_HOST".to_string()));
    }

    #[test]
    fn extracts_routes_from_http_verbs_and_decorators() {
        let text = "GET /users/{id}/profile\n@Get('/health')";
        let artifacts = extract_from_text(text);
        let endpoints = artifacts.endpoints.unwrap();
        assert!(endpoints.contains(&"/users/{id}/profile".to_string()));
        assert!(endpoints.contains(&"/health".to_string()));
    }
}
