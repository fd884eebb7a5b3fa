// ── Memory backend ─────────────────────────────────────────────────────────
// The long-term memory capability is an external, user-scoped service.
// `MemoryBackend` is the seam: the HTTP implementation talks to the real
// service; tests substitute an in-memory fake. Errors surface here as
// `EngineResult` — the best-effort swallowing happens one layer up in
// `MemoryService`, not in the transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::atoms::constants::MEMORY_TIMEOUT_SECS;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::MemoryEntry;

#[async_trait]
pub trait MemoryBackend: Send + Sync {
    /// Store an entry; returns the service-assigned id.
    async fn add(&self, entry: &MemoryEntry) -> EngineResult<String>;

    /// All entries for a user, newest first.
    async fn list(&self, user_id: &str) -> EngineResult<Vec<MemoryEntry>>;

    /// Relevance-ranked entries for a query, scoped to a user.
    async fn search(&self, user_id: &str, query: &str, limit: usize) -> EngineResult<Vec<MemoryEntry>>;

    async fn update(&self, id: &str, content: &str) -> EngineResult<()>;

    async fn delete(&self, id: &str) -> EngineResult<()>;
}

// ── HTTP implementation ────────────────────────────────────────────────────

pub struct HttpMemoryBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct AddResponse {
    id: String,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    memories: Vec<MemoryEntry>,
}

#[derive(Deserialize)]
struct SearchBackendResponse {
    #[serde(default)]
    results: Vec<MemoryEntry>,
}

impl HttpMemoryBackend {
    /// The short client timeout is the soft-failure bound: a slow memory
    /// service degrades to generic behavior instead of stalling the turn.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(MEMORY_TIMEOUT_SECS))
            .build()?;
        Ok(HttpMemoryBackend {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(resp: reqwest::Response) -> EngineResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(EngineError::Memory(format!(
            "memory service returned {}: {}",
            status.as_u16(),
            body
        )))
    }
}

#[async_trait]
impl MemoryBackend for HttpMemoryBackend {
    async fn add(&self, entry: &MemoryEntry) -> EngineResult<String> {
        let resp = self
            .client
            .post(self.url("/v1/memories"))
            .bearer_auth(&self.api_key)
            .json(entry)
            .send()
            .await?;
        let parsed: AddResponse = Self::check(resp).await?.json().await?;
        Ok(parsed.id)
    }

    async fn list(&self, user_id: &str) -> EngineResult<Vec<MemoryEntry>> {
        let resp = self
            .client
            .get(self.url("/v1/memories"))
            .bearer_auth(&self.api_key)
            .query(&[("user_id", user_id)])
            .send()
            .await?;
        let parsed: ListResponse = Self::check(resp).await?.json().await?;
        Ok(parsed.memories)
    }

    async fn search(&self, user_id: &str, query: &str, limit: usize) -> EngineResult<Vec<MemoryEntry>> {
        let body = serde_json::json!({
            "user_id": user_id,
            "query": query,
            "limit": limit,
        });
        let resp = self
            .client
            .post(self.url("/v1/memories/search"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: SearchBackendResponse = Self::check(resp).await?.json().await?;
        Ok(parsed.results)
    }

    async fn update(&self, id: &str, content: &str) -> EngineResult<()> {
        let body = serde_json::json!({ "content": content });
        let resp = self
            .client
            .put(self.url(&format!("/v1/memories/{id}")))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> EngineResult<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/v1/memories/{id}")))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
