use crate::adapters::{
    CreatePatchPrParams, DocumentAdapter, GitBackedAdapter, PrResult, WritePatchParams,
};
use crate::domain::audit_trail::AuditTrailRow;
use crate::error::AdapterError;
use async_trait::async_trait;
use std::time::Instant;

/// Builds a fresh patch body against the current revision of a document.
/// Invoked by the conflict-retry loop after an optimistic-concurrency
/// mismatch, so the regenerated content is grounded in what's actually on
/// the page now rather than the stale revision the proposal was planned
/// against (§4.7).
#[async_trait]
pub trait PatchRegenerator: Send + Sync {
    async fn regenerate(
        &self,
        current_content: &str,
        current_revision: &str,
    ) -> Result<String, AdapterError>;
}

#[derive(Debug, Clone)]
pub struct WritebackOutcome {
    pub new_revision: String,
    pub retries_used: u32,
    pub audit_row_metadata: serde_json::Value,
}

/// Writes an approved patch to a direct-writeback (wiki-style) target,
/// retrying on `AdapterError::Conflict` by rebuilding the patch against the
/// document's current revision, up to `max_retries` times (§4.7, §4.5).
pub async fn apply_direct(
    adapter: &dyn DocumentAdapter,
    doc_ref: &str,
    mut content: String,
    mut base_revision: String,
    regenerator: &dyn PatchRegenerator,
    max_retries: u32,
) -> Result<WritebackOutcome, AdapterError> {
    let started = Instant::now();
    let mut retries_used = 0;

    loop {
        let result = adapter
            .write_patch(WritePatchParams {
                doc_ref: doc_ref.to_string(),
                base_revision: base_revision.clone(),
                new_content: content.clone(),
            })
            .await;

        match result {
            Ok(write_result) => {
                return Ok(WritebackOutcome {
                    new_revision: write_result.new_revision,
                    retries_used,
                    audit_row_metadata: serde_json::json!({
                        "docRef": doc_ref,
                        "durationMs": started.elapsed().as_millis() as u64,
                        "retriesUsed": retries_used,
                    }),
                });
            }
            Err(AdapterError::Conflict { .. }) if retries_used < max_retries => {
                let current = adapter.fetch(doc_ref).await?;
                content = regenerator
                    .regenerate(&current.content, &current.revision)
                    .await?;
                base_revision = current.revision;
                retries_used += 1;
            }
            Err(other) => return Err(other),
        }
    }
}

/// Writes an approved patch to a Git-backed target by opening a PR. Unlike
/// direct writeback, a PR never conflicts with a concurrent edit in the
/// same way, so there is no retry loop here.
pub async fn apply_via_pr(
    adapter: &dyn GitBackedAdapter,
    params: CreatePatchPrParams,
) -> Result<PrResult, AdapterError> {
    adapter.create_patch_pr(params).await
}

/// Builds the `applied` audit row appended after a successful writeback
/// (§4.7).
pub fn applied_audit_row(
    workspace_id: &str,
    drift_id: &str,
    from_state: &str,
    duration_ms: u64,
    metadata: serde_json::Value,
) -> AuditTrailRow {
    AuditTrailRow::transition(
        workspace_id,
        drift_id,
        Some(from_state),
        "APPLIED",
        "writeback_executor",
        duration_ms,
        metadata,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{DocFetchResult, WriteResult};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FlakyAdapter {
        conflicts_remaining: AtomicU32,
        revision: Mutex<String>,
    }

    #[async_trait]
    impl DocumentAdapter for FlakyAdapter {
        async fn fetch(&self, doc_ref: &str) -> Result<DocFetchResult, AdapterError> {
            Ok(DocFetchResult {
                content: "current content".to_string(),
                revision: self.revision.lock().unwrap().clone(),
                doc_url: format!("https://wiki.example.com/{doc_ref}"),
            })
        }

        async fn write_patch(
            &self,
            params: WritePatchParams,
        ) -> Result<WriteResult, AdapterError> {
            if self.conflicts_remaining.load(Ordering::SeqCst) > 0 {
                self.conflicts_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(AdapterError::Conflict {
                    doc_ref: params.doc_ref,
                    expected: params.base_revision,
                    actual: self.revision.lock().unwrap().clone(),
                });
            }
            let mut revision = self.revision.lock().unwrap();
            *revision = format!("{}-next", *revision);
            Ok(WriteResult {
                new_revision: revision.clone(),
            })
        }

        fn supports_direct_writeback(&self) -> bool {
            true
        }

        fn get_doc_url(&self, doc_ref: &str) -> String {
            format!("https://wiki.example.com/{doc_ref}")
        }
    }

    struct EchoRegenerator;

    #[async_trait]
    impl PatchRegenerator for EchoRegenerator {
        async fn regenerate(
            &self,
            current_content: &str,
            _current_revision: &str,
        ) -> Result<String, AdapterError> {
            Ok(format!("{current_content} (patched)"))
        }
    }

    #[tokio::test]
    async fn a_conflict_free_write_succeeds_without_retrying() {
        let adapter = FlakyAdapter {
            conflicts_remaining: AtomicU32::new(0),
            revision: Mutex::new("v1".to_string()),
        };
        let outcome = apply_direct(
            &adapter,
            "space/PAGE-1",
            "new content".to_string(),
            "v1".to_string(),
            &EchoRegenerator,
            3,
        )
        .await
        .unwrap();
        assert_eq!(outcome.retries_used, 0);
        assert_eq!(outcome.new_revision, "v1-next");
    }

    #[tokio::test]
    async fn a_conflict_rebuilds_against_the_current_revision_and_retries() {
        let adapter = FlakyAdapter {
            conflicts_remaining: AtomicU32::new(2),
            revision: Mutex::new("v1".to_string()),
        };
        let outcome = apply_direct(
            &adapter,
            "space/PAGE-1",
            "new content".to_string(),
            "v1".to_string(),
            &EchoRegenerator,
            3,
        )
        .await
        .unwrap();
        assert_eq!(outcome.retries_used, 2);
    }

    #[tokio::test]
    async fn exhausting_retries_surfaces_the_conflict() {
        let adapter = FlakyAdapter {
            conflicts_remaining: AtomicU32::new(5),
            revision: Mutex::new("v1".to_string()),
        };
        let result = apply_direct(
            &adapter,
            "space/PAGE-1",
            "new content".to_string(),
            "v1".to_string(),
            &EchoRegenerator,
            2,
        )
        .await;
        assert!(matches!(result, Err(AdapterError::Conflict { .. })));
    }
}
