use crate::domain::drift_candidate::DriftType;
use crate::domain::evidence_bundle::Fingerprints;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

static ENV_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[-_.](dev|staging|stage|prod|production|test|qa)\d*\b").unwrap());
static PORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\d{2,5}\b").unwrap());
static API_VERSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bv\d+(\.\d+)*\b").unwrap());

/// Collapses environment suffixes, tool aliases, ports, and API versions
/// into placeholders so fingerprints survive cosmetic diffs (§4.6).
pub fn normalize_token(token: &str) -> String {
    let t = canonicalize_tool_alias(token);
    let t = ENV_SUFFIX.replace_all(&t, "_ENV").to_string();
    let t = PORT.replace_all(&t, ":PORT").to_string();
    let t = API_VERSION.replace_all(&t, "VERSION").to_string();
    t.to_lowercase()
}

fn canonicalize_tool_alias(token: &str) -> String {
    let lower = token.to_lowercase();
    match lower.as_str() {
        "kubectl" | "helm" => "k8s_tool".to_string(),
        "docker" | "podman" => "container_tool".to_string(),
        _ => token.to_string(),
    }
}

/// SHA-256 of the joined, normalized tokens, hex-encoded. Used both for
/// fingerprints below and for deterministic id derivation of signals that
/// have no natural external key (e.g. `slack_cluster`).
pub fn hash_tokens(tokens: &[&str]) -> String {
    let normalized: Vec<String> = tokens.iter().map(|t| normalize_token(t)).collect();
    let mut hasher = Sha256::new();
    hasher.update(normalized.join("\u{1f}").as_bytes());
    format!("{:x}", hasher.finalize())
}

fn prefix(hash: &str) -> String {
    hash.chars().take(16).collect()
}

/// Computes the three fingerprint levels for a candidate's comparison
/// result. `tokens` is the deduplicated token set from the evidence bundle
/// (command names, routes, identifiers — whatever the comparison engine
/// flagged as drift-relevant).
pub fn compute_fingerprints(
    source: &str,
    target: &str,
    drift_type: DriftType,
    tokens: &[String],
) -> Fingerprints {
    let drift_label = format!("{:?}", drift_type);
    let mut sorted_tokens: Vec<String> = tokens.iter().map(|t| normalize_token(t)).collect();
    sorted_tokens.sort();
    sorted_tokens.dedup();

    let target_surface = target.split('/').next().unwrap_or(target);

    let strict_input: Vec<&str> = std::iter::once(source.as_ref())
        .chain(std::iter::once(target.as_ref()))
        .chain(std::iter::once(drift_label.as_str()))
        .chain(sorted_tokens.iter().map(|s| s.as_str()))
        .collect();
    let strict = prefix(&hash_tokens(&strict_input));

    let top10: Vec<&str> = sorted_tokens.iter().take(10).map(|s| s.as_str()).collect();
    let medium_input: Vec<&str> = std::iter::once(source.as_ref())
        .chain(std::iter::once(target.as_ref()))
        .chain(std::iter::once(drift_label.as_str()))
        .chain(top10)
        .collect();
    let medium = prefix(&hash_tokens(&medium_input));

    let broad = prefix(&hash_tokens(&[source, target_surface, &drift_label]));

    Fingerprints {
        strict,
        medium,
        broad,
    }
}
