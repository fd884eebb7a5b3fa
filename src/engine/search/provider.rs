// ── Search providers ───────────────────────────────────────────────────────
// The external web search capability behind the retrieval pipeline.
// Tavily is the production provider; tests stub the trait. Unlike the
// memory backend, errors here propagate — search is on the critical path
// for factual grounding and callers must see hard failures.

use std::time::Duration;

use async_trait::async_trait;

use crate::atoms::constants::SEARCH_TIMEOUT_SECS;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{SearchHit, SearchOptions};

/// Unranked provider output; the ranking pipeline in `search::mod` turns
/// this into a `SearchResponse`.
#[derive(Debug, Clone)]
pub struct RawSearchResponse {
    pub hits: Vec<SearchHit>,
    pub answer: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn raw_search(&self, query: &str, opts: &SearchOptions) -> EngineResult<RawSearchResponse>;
}

// ── Tavily ─────────────────────────────────────────────────────────────────

pub struct TavilyProvider {
    client: reqwest::Client,
    api_key: String,
}

impl TavilyProvider {
    /// Fails fast with a configuration error when the key is absent —
    /// deliberately distinct from a search that returns no results.
    pub fn new(api_key: Option<String>) -> EngineResult<Self> {
        let api_key = match api_key {
            Some(k) if !k.trim().is_empty() => k,
            _ => {
                return Err(EngineError::Config(
                    "search API key is not configured (set TAVILY_API_KEY)".into(),
                ))
            }
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()?;
        Ok(TavilyProvider { client, api_key })
    }

    pub fn from_env() -> EngineResult<Self> {
        Self::new(std::env::var("TAVILY_API_KEY").ok())
    }
}

#[async_trait]
impl SearchProvider for TavilyProvider {
    async fn raw_search(&self, query: &str, opts: &SearchOptions) -> EngineResult<RawSearchResponse> {
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": opts.depth.as_str(),
            "max_results": opts.max_results,
            "include_answer": opts.include_answer,
            "include_raw_content": opts.include_raw_content,
            "exclude_domains": opts.exclude_domains,
        });

        let response = self
            .client
            .post("https://api.tavily.com/search")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let err_body = response.text().await.unwrap_or_default();
            return Err(EngineError::Search(format!(
                "Tavily API error ({}): {}",
                status.as_u16(),
                err_body
            )));
        }

        let data: serde_json::Value = response.json().await?;

        let hits = data
            .get("results")
            .and_then(|r| r.as_array())
            .map(|arr| {
                arr.iter()
                    .map(|item| SearchHit {
                        title: item.get("title").and_then(|t| t.as_str()).unwrap_or("").to_string(),
                        url: item.get("url").and_then(|u| u.as_str()).unwrap_or("").to_string(),
                        content: item.get("content").and_then(|c| c.as_str()).unwrap_or("").to_string(),
                        score: item
                            .get("score")
                            .and_then(|s| s.as_f64())
                            .unwrap_or(0.0)
                            .clamp(0.0, 1.0),
                        published_date: item
                            .get("published_date")
                            .and_then(|d| d.as_str())
                            .map(|d| d.to_string()),
                        source_domain: None,
                        is_official: false,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let answer = data
            .get("answer")
            .and_then(|a| a.as_str())
            .filter(|a| !a.is_empty())
            .map(|a| a.to_string());

        Ok(RawSearchResponse { hits, answer })
    }
}
