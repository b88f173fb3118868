use super::{DocFetchResult, DocumentAdapter, WritePatchParams, WriteResult};
use crate::error::AdapterError;
use crate::http::AdapterRateLimiter;
use async_trait::async_trait;
use serde::Deserialize;

/// Confluence/Notion-style direct writeback with optimistic concurrency
/// (§4.5): `write_patch` compares `base_revision` against the current
/// revision before writing; a mismatch is an `AdapterError::Conflict`,
/// which the caller handles by re-running the pipeline from `DOCS_RESOLVED`
/// rather than retrying blindly.
pub struct WikiAdapter {
    base_url: String,
    auth_token: String,
    client: reqwest::Client,
    rate_limiter: AdapterRateLimiter,
}

#[derive(Debug, Deserialize)]
struct WikiPageResponse {
    #[serde(default)]
    content: String,
    version: String,
}

impl WikiAdapter {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: auth_token.into(),
            client: reqwest::Client::new(),
            rate_limiter: AdapterRateLimiter::new(10, 20),
        }
    }

    fn page_url(&self, doc_ref: &str) -> String {
        format!("{}/pages/{}", self.base_url, doc_ref)
    }
}

#[async_trait]
impl DocumentAdapter for WikiAdapter {
    async fn fetch(&self, doc_ref: &str) -> Result<DocFetchResult, AdapterError> {
        self.rate_limiter.acquire().await;

        let response = self
            .client
            .get(self.page_url(doc_ref))
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AdapterError::NotFound(doc_ref.to_string()));
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AdapterError::Auth(doc_ref.to_string()));
        }

        let page: WikiPageResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        Ok(DocFetchResult {
            content: page.content,
            revision: page.version,
            doc_url: self.get_doc_url(doc_ref),
        })
    }

    async fn write_patch(&self, params: WritePatchParams) -> Result<WriteResult, AdapterError> {
        self.rate_limiter.acquire().await;

        let current = self.fetch(&params.doc_ref).await?;
        if current.revision != params.base_revision {
            return Err(AdapterError::Conflict {
                doc_ref: params.doc_ref,
                expected: params.base_revision,
                actual: current.revision,
            });
        }

        let response = self
            .client
            .put(self.page_url(&params.doc_ref))
            .bearer_auth(&self.auth_token)
            .json(&serde_json::json!({
                "content": params.new_content,
                "baseVersion": params.base_revision,
            }))
            .send()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(AdapterError::Conflict {
                doc_ref: params.doc_ref,
                expected: params.base_revision,
                actual: "unknown".to_string(),
            });
        }

        let updated: WikiPageResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Network(e.to_string()))?;

        Ok(WriteResult {
            new_revision: updated.version,
        })
    }

    fn supports_direct_writeback(&self) -> bool {
        true
    }

    fn get_doc_url(&self, doc_ref: &str) -> String {
        format!("{}/pages/{}", self.base_url, doc_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_url_is_derived_from_base_url_and_ref() {
        let adapter = WikiAdapter::new("https://wiki.example.com/api", "token");
        assert_eq!(
            adapter.get_doc_url("space/PAGE-1"),
            "https://wiki.example.com/api/pages/space/PAGE-1"
        );
    }

    #[test]
    fn wiki_adapter_supports_direct_writeback() {
        let adapter = WikiAdapter::new("https://wiki.example.com/api", "token");
        assert!(adapter.supports_direct_writeback());
    }
}
