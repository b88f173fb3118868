use super::{
    CreatePatchPrParams, DocFetchResult, DocumentAdapter, GitBackedAdapter, PrResult,
    WritePatchParams, WriteResult,
};
use crate::error::AdapterError;
use crate::http::AdapterRateLimiter;
use async_trait::async_trait;
use octocrab::Octocrab;

/// README / Swagger-OpenAPI / Backstage catalog / GitBook targets (§4.5):
/// no direct writeback, `create_patch_pr` opens a branch, commits via the
/// Git content API, and opens a PR.
pub struct GitContentAdapter {
    client: Octocrab,
    owner: String,
    repo: String,
    base_branch: String,
    rate_limiter: AdapterRateLimiter,
}

impl GitContentAdapter {
    pub fn new(
        client: Octocrab,
        owner: impl Into<String>,
        repo: impl Into<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
            base_branch: base_branch.into(),
            rate_limiter: AdapterRateLimiter::new(10, 20),
        }
    }
}

#[async_trait]
impl DocumentAdapter for GitContentAdapter {
    async fn fetch(&self, doc_ref: &str) -> Result<DocFetchResult, AdapterError> {
        self.rate_limiter.acquire().await;

        let content_items = self
            .client
            .repos(&self.owner, &self.repo)
            .get_content()
            .path(doc_ref)
            .r#ref(&self.base_branch)
            .send()
            .await
            .map_err(|e| map_octocrab_error(doc_ref, e))?;

        let file = content_items
            .items
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::NotFound(doc_ref.to_string()))?;

        let decoded = file
            .decoded_content()
            .ok_or_else(|| AdapterError::NotFound(doc_ref.to_string()))?;

        Ok(DocFetchResult {
            content: decoded,
            revision: file.sha,
            doc_url: self.get_doc_url(doc_ref),
        })
    }

    async fn write_patch(&self, _params: WritePatchParams) -> Result<WriteResult, AdapterError> {
        Err(AdapterError::NotFound(
            "git-backed targets require create_patch_pr, not write_patch".to_string(),
        ))
    }

    fn supports_direct_writeback(&self) -> bool {
        false
    }

    fn get_doc_url(&self, doc_ref: &str) -> String {
        format!(
            "https://github.com/{}/{}/blob/{}/{}",
            self.owner, self.repo, self.base_branch, doc_ref
        )
    }
}

#[async_trait]
impl GitBackedAdapter for GitContentAdapter {
    async fn create_patch_pr(&self, params: CreatePatchPrParams) -> Result<PrResult, AdapterError> {
        self.rate_limiter.acquire().await;

        let repo_handle = self.client.repos(&self.owner, &self.repo);

        let base_ref = repo_handle
            .get_ref(&octocrab::params::repos::Reference::Branch(
                self.base_branch.clone(),
            ))
            .await
            .map_err(|e| map_octocrab_error(&params.doc_ref, e))?;

        let base_sha = match base_ref.object {
            octocrab::models::repos::Object::Commit { sha, .. } => sha,
            octocrab::models::repos::Object::Tag { sha, .. } => sha,
            _ => return Err(AdapterError::NotFound(self.base_branch.clone())),
        };

        repo_handle
            .create_ref(
                &octocrab::params::repos::Reference::Branch(params.branch_name.clone()),
                base_sha,
            )
            .await
            .map_err(|e| map_octocrab_error(&params.branch_name, e))?;

        let existing = self.fetch(&params.doc_ref).await.ok();
        let mut update = repo_handle.update_file(
            &params.doc_ref,
            &params.title,
            &params.new_content,
            existing
                .as_ref()
                .map(|d| d.revision.clone())
                .unwrap_or_default(),
        );
        update = update.branch(&params.branch_name);
        update
            .send()
            .await
            .map_err(|e| map_octocrab_error(&params.doc_ref, e))?;

        let pr = self
            .client
            .pulls(&self.owner, &self.repo)
            .create(&params.title, &params.branch_name, &self.base_branch)
            .body(&params.body)
            .send()
            .await
            .map_err(|e| map_octocrab_error(&params.doc_ref, e))?;

        Ok(PrResult {
            pr_number: pr.number,
            pr_url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
        })
    }
}

fn map_octocrab_error(doc_ref: &str, error: octocrab::Error) -> AdapterError {
    match &error {
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404 => {
            AdapterError::NotFound(doc_ref.to_string())
        }
        octocrab::Error::GitHub { source, .. }
            if source.status_code.as_u16() == 401 || source.status_code.as_u16() == 403 =>
        {
            AdapterError::Auth(doc_ref.to_string())
        }
        octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 429 => {
            AdapterError::RateLimited {
                retry_after_ms: 60_000,
            }
        }
        _ => AdapterError::Network(error.to_string()),
    }
}
