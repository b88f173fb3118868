use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Pipeline-wide counters, gated behind the `observability` feature the way
/// the teacher gates its GitHub API metrics.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub candidates_ingested: AtomicU64,
    pub candidates_ignored: AtomicU64,
    pub candidates_failed: AtomicU64,
    pub candidates_applied: AtomicU64,
    pub notifications_sent: AtomicU64,
    pub notifications_rate_limited: AtomicU64,
    pub adapter_errors: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ingested(&self) {
        self.candidates_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_terminal(&self, state: &str) {
        match state {
            "IGNORED" => {
                self.candidates_ignored.fetch_add(1, Ordering::Relaxed);
            }
            "APPLIED" => {
                self.candidates_applied.fetch_add(1, Ordering::Relaxed);
            }
            s if s.starts_with("FAILED") => {
                self.candidates_failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn record_notification_sent(&self) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notification_rate_limited(&self) {
        self.notifications_rate_limited
            .fetch_add(1, Ordering::Relaxed);
        warn!("notification rate cap reached for workspace");
    }

    pub fn record_adapter_error(&self) {
        self.adapter_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            candidates_ingested: self.candidates_ingested.load(Ordering::Relaxed),
            candidates_ignored: self.candidates_ignored.load(Ordering::Relaxed),
            candidates_failed: self.candidates_failed.load(Ordering::Relaxed),
            candidates_applied: self.candidates_applied.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_rate_limited: self.notifications_rate_limited.load(Ordering::Relaxed),
            adapter_errors: self.adapter_errors.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            ingested = stats.candidates_ingested,
            ignored = stats.candidates_ignored,
            failed = stats.candidates_failed,
            applied = stats.candidates_applied,
            notifications_sent = stats.notifications_sent,
            rate_limited = stats.notifications_rate_limited,
            "pipeline metrics snapshot"
        );
    }
}

#[derive(Debug, Clone)]
pub struct PipelineMetricsSnapshot {
    pub candidates_ingested: u64,
    pub candidates_ignored: u64,
    pub candidates_failed: u64,
    pub candidates_applied: u64,
    pub notifications_sent: u64,
    pub notifications_rate_limited: u64,
    pub adapter_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

static PIPELINE_METRICS: std::sync::LazyLock<PipelineMetrics> =
    std::sync::LazyLock::new(PipelineMetrics::new);

pub fn pipeline_metrics() -> &'static PipelineMetrics {
    &PIPELINE_METRICS
}

/// Time a stage invocation and log its duration on drop-equivalent `finish`.
pub struct StageTimer {
    stage: String,
    start: Instant,
}

impl StageTimer {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let duration = self.start.elapsed();
        info!(
            stage = %self.stage,
            duration_ms = duration.as_millis(),
            "stage completed"
        );
    }
}
