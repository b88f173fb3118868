use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Process-wide worker configuration. Per-workspace tunables (confidence
/// thresholds, workflow preferences) live in `Workspace` rows, not here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DriftWorkerConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub observability: ObservabilityConfig,
    pub adapters: AdapterConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// How often the consumer polls the external queue for deliveries.
    pub poll_interval_ms: u64,
    /// Wall-clock budget given to a single stage handler, per §5.
    pub stage_budget_seconds: u64,
    /// Budget for stages that early-exit with no matched surfaces.
    pub early_exit_budget_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    pub tracing_enabled: bool,
    pub otlp_endpoint: Option<String>,
    pub log_level: String,
    pub metrics_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdapterConfig {
    /// Per-adapter concurrency cap for internal fan-out (§5).
    pub max_concurrent_fetches: u32,
    pub http_timeout_ms: u64,
    pub rate_limit_per_second: u32,
    pub rate_limit_burst: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub max_retries: u32,
    pub request_timeout_ms: u64,
    /// Bounds on the document slice handed to the patch generator (§4.5).
    pub max_doc_chars_sent_to_llm: usize,
    pub max_sections: usize,
    pub max_section_chars: usize,
}

impl Default for DriftWorkerConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: ".drift-agent/drift.db".to_string(),
                max_connections: 10,
                auto_migrate: true,
            },
            queue: QueueConfig {
                poll_interval_ms: 500,
                stage_budget_seconds: 30,
                early_exit_budget_seconds: 1,
            },
            observability: ObservabilityConfig {
                tracing_enabled: true,
                otlp_endpoint: None,
                log_level: "info".to_string(),
                metrics_enabled: true,
            },
            adapters: AdapterConfig {
                max_concurrent_fetches: 4,
                http_timeout_ms: 10_000,
                rate_limit_per_second: 10,
                rate_limit_burst: 20,
            },
            llm: LlmConfig {
                endpoint: "http://localhost:11434".to_string(),
                model: "drift-patch-generator".to_string(),
                max_retries: 3,
                request_timeout_ms: 30_000,
                max_doc_chars_sent_to_llm: 12_000,
                max_sections: 20,
                max_section_chars: 2_000,
            },
        }
    }
}

impl DriftWorkerConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `drift-agent.toml` / `.drift-agent-rc`
    /// 3. Environment variables (prefixed with `DRIFT_AGENT_`)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder();

        if let Ok(explicit_path) = std::env::var("DRIFT_AGENT_CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&explicit_path));
        } else if Path::new("drift-agent.toml").exists() {
            builder = builder.add_source(File::with_name("drift-agent"));
        }
        if Path::new(".drift-agent-rc").exists() {
            builder = builder.add_source(File::with_name(".drift-agent-rc"));
        }

        builder = builder.add_source(
            Environment::with_prefix("DRIFT_AGENT")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let worker_config: DriftWorkerConfig = config.try_deserialize()?;
        Ok(worker_config)
    }

    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Per-tenant tunables, stored as a `Workspace` row (§3) rather than process
/// config. Defaults here match the spec's documented defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspacePolicyDefaults {
    pub high_confidence_threshold: f64,
    pub medium_confidence_threshold: f64,
    pub materiality_threshold: f64,
    pub ownership_source_ranking: Vec<String>,
}

impl Default for WorkspacePolicyDefaults {
    fn default() -> Self {
        Self {
            high_confidence_threshold: 0.70,
            medium_confidence_threshold: 0.55,
            materiality_threshold: 0.3,
            ownership_source_ranking: vec![
                "github_codeowners".to_string(),
                "github_pr".to_string(),
                "pagerduty_incident".to_string(),
            ],
        }
    }
}

/// Recognized `workflowPreferences` keys (§6.4). Stored as a typed struct on
/// `Workspace` rather than a loose map so stage handlers get compile-time
/// field access.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowPreferences {
    pub enabled_drift_types: HashSet<String>,
    pub enabled_input_sources: HashSet<String>,
    pub enabled_output_targets: HashSet<String>,
    pub output_target_priority: Vec<String>,
    pub evidence_grounded_patching: bool,
    pub skip_low_value_patches: bool,
    pub expanded_context_mode: bool,
    pub track_cumulative_drift: bool,
}

impl Default for WorkflowPreferences {
    fn default() -> Self {
        Self {
            enabled_drift_types: [
                "instruction",
                "process",
                "ownership",
                "environment",
                "coverage",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            enabled_input_sources: [
                "github_pr",
                "pagerduty_incident",
                "slack_cluster",
                "datadog_alert",
                "grafana_alert",
                "github_iac",
                "github_codeowners",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            enabled_output_targets: HashSet::new(),
            output_target_priority: Vec::new(),
            evidence_grounded_patching: true,
            skip_low_value_patches: true,
            expanded_context_mode: false,
            track_cumulative_drift: false,
        }
    }
}

/// Global configuration instance, following the teacher's lazily-initialized
/// fallible-singleton pattern.
static CONFIG: std::sync::LazyLock<Result<DriftWorkerConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = DriftWorkerConfig::load_env_file();
        DriftWorkerConfig::load()
    });

/// Get the global configuration.
pub fn config() -> Result<&'static DriftWorkerConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup).
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_spec() {
        let defaults = WorkspacePolicyDefaults::default();
        assert_eq!(defaults.high_confidence_threshold, 0.70);
        assert_eq!(defaults.medium_confidence_threshold, 0.55);
        assert_eq!(defaults.materiality_threshold, 0.3);
    }

    #[test]
    fn default_workflow_preferences_enable_all_sources() {
        let prefs = WorkflowPreferences::default();
        assert!(prefs.enabled_input_sources.contains("github_pr"));
        assert!(prefs.enabled_drift_types.contains("coverage"));
    }
}
