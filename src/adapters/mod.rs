pub mod git_backed;
pub mod wiki;

use crate::error::AdapterError;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct DocFetchResult {
    pub content: String,
    pub revision: String,
    pub doc_url: String,
}

#[derive(Debug, Clone)]
pub struct WritePatchParams {
    pub doc_ref: String,
    pub base_revision: String,
    pub new_content: String,
}

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub new_revision: String,
}

#[derive(Debug, Clone)]
pub struct CreatePatchPrParams {
    pub doc_ref: String,
    pub new_content: String,
    pub branch_name: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct PrResult {
    pub pr_number: u64,
    pub pr_url: String,
}

/// The uniform surface every document target implements (§4.5). Git-backed
/// targets additionally implement `GitBackedAdapter` for PR-based writeback;
/// calling `write_patch` on one of those is a programming error, not a
/// runtime `AdapterError`, since `supports_direct_writeback()` tells the
/// caller which path to take before it ever calls either.
#[async_trait]
pub trait DocumentAdapter: Send + Sync {
    async fn fetch(&self, doc_ref: &str) -> Result<DocFetchResult, AdapterError>;
    async fn write_patch(&self, params: WritePatchParams) -> Result<WriteResult, AdapterError>;
    fn supports_direct_writeback(&self) -> bool;
    fn get_doc_url(&self, doc_ref: &str) -> String;
}

#[async_trait]
pub trait GitBackedAdapter: DocumentAdapter {
    async fn create_patch_pr(&self, params: CreatePatchPrParams) -> Result<PrResult, AdapterError>;
}

pub const MANAGED_REGION_START: &str = "<!-- DRIFT_AGENT_MANAGED_START -->";
pub const MANAGED_REGION_END: &str = "<!-- DRIFT_AGENT_MANAGED_END -->";

/// Extracts the `(start, end)` byte offsets of the managed region in
/// `content`, if one is declared (§4.5). When absent, callers fall back to
/// owner-block + section-target ranges computed by the claim extractor.
pub fn managed_region(content: &str) -> Option<(usize, usize)> {
    let start = content.find(MANAGED_REGION_START)?;
    let end = content.find(MANAGED_REGION_END)?;
    if end < start {
        return None;
    }
    Some((start + MANAGED_REGION_START.len(), end))
}
