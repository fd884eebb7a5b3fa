// Compass Core — Retrieval Subsystem
//
// Wraps the external search capability with domain-trust ranking:
// 1. Rewrite the query with an institutional site restriction and merge
//    the caller's domain exclusions with a fixed noise denylist.
// 2. Execute the provider call.
// 3. Boost hits on trusted domains (×1.5, clamped to 1.0); a hit with an
//    unparseable URL falls back to naive hostname splitting and is kept.
// 4. Stable sort by adjusted score, compute confidence, truncate last.
//
// Module layout:
//   provider.rs — SearchProvider trait + TavilyProvider
//   mod.rs      — ranking pipeline + specialized lookup wrappers

pub mod provider;

pub use provider::{RawSearchResponse, SearchProvider, TavilyProvider};

use std::sync::Arc;

use chrono::{Datelike, Utc};
use log::info;
use url::Url;

use crate::atoms::constants::{
    NOISE_DOMAINS, SITE_RESTRICTION, TRUSTED_CONFIDENCE_BASE, TRUSTED_CONFIDENCE_CAP,
    TRUSTED_CONFIDENCE_PER_HIT, TRUSTED_DOMAINS, TRUST_BOOST, UNTRUSTED_CONFIDENCE_CAP,
};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{SearchDepth, SearchOptions, SearchResponse};

pub struct OpportunitySearch {
    provider: Arc<dyn SearchProvider>,
}

impl OpportunitySearch {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        OpportunitySearch { provider }
    }

    /// Production constructor: Tavily keyed from the environment.
    /// Missing credential fails here, not at first query.
    pub fn from_env() -> EngineResult<Self> {
        Ok(Self::new(Arc::new(TavilyProvider::from_env()?)))
    }

    // ── Main pipeline ──────────────────────────────────────────────────

    pub async fn search(&self, query: &str, opts: SearchOptions) -> EngineResult<SearchResponse> {
        let rewritten = format!("{query} {SITE_RESTRICTION}");

        let mut opts = opts;
        for noise in NOISE_DOMAINS {
            if !opts.exclude_domains.iter().any(|d| d == noise) {
                opts.exclude_domains.push(noise.to_string());
            }
        }

        let raw = self.provider.raw_search(&rewritten, &opts).await?;
        let mut hits = raw.hits;

        let mut trusted_count = 0usize;
        for hit in &mut hits {
            let host = hostname_of(&hit.url);
            if is_trusted(&host) {
                hit.is_official = true;
                hit.score = (hit.score * TRUST_BOOST).min(1.0);
                trusted_count += 1;
            }
            hit.source_domain = Some(host);
        }

        // sort_by is stable: equal adjusted scores keep provider order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let confidence = if trusted_count > 0 {
            (TRUSTED_CONFIDENCE_BASE + TRUSTED_CONFIDENCE_PER_HIT * trusted_count as f64)
                .min(TRUSTED_CONFIDENCE_CAP)
        } else {
            hits.first()
                .map(|h| h.score)
                .unwrap_or(0.0)
                .min(UNTRUSTED_CONFIDENCE_CAP)
        };

        // Truncate only after scoring and sorting, so the boost can pull a
        // trusted hit into the window.
        hits.truncate(opts.max_results);

        info!(
            "[search] '{}' → {} hit(s), {} trusted, confidence {:.2}",
            query,
            hits.len(),
            trusted_count,
            confidence
        );

        Ok(SearchResponse { hits, answer: raw.answer, query: rewritten, confidence })
    }

    // ── Specialized lookups ────────────────────────────────────────────
    // Query-template wrappers over the same pipeline with fixed choices.

    pub async fn opportunity_details(&self, title: &str, org: &str) -> EngineResult<SearchResponse> {
        self.search(
            &format!("{title} {org} eligibility requirements application"),
            SearchOptions {
                depth: SearchDepth::Advanced,
                max_results: 3,
                include_answer: true,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn deadline_lookup(&self, title: &str, org: &str) -> EngineResult<SearchResponse> {
        let year = Utc::now().year();
        self.search(
            &format!("{title} {org} application deadline {year}"),
            SearchOptions {
                depth: SearchDepth::Basic,
                max_results: 3,
                include_answer: true,
                ..Default::default()
            },
        )
        .await
    }

    pub async fn contact_lookup(&self, org: &str, topic: &str) -> EngineResult<SearchResponse> {
        self.search(
            &format!("{org} {topic} coordinator contact email"),
            SearchOptions {
                depth: SearchDepth::Advanced,
                max_results: 3,
                include_answer: true,
                ..Default::default()
            },
        )
        .await
    }
}

// ── Hostname handling ──────────────────────────────────────────────────────

/// Hostname of a hit URL. Falls back to naive string splitting when the URL
/// fails to parse, so no hit is ever dropped over a malformed link.
fn hostname_of(raw: &str) -> String {
    if let Ok(parsed) = Url::parse(raw) {
        if let Some(host) = parsed.host_str() {
            return host.to_lowercase();
        }
    }
    let stripped = raw.split("://").last().unwrap_or(raw);
    stripped
        .split('/')
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// Exact or dot-suffix membership in the trusted-domain list, so
/// `www.nsf.gov` counts but `notnsf.gov` does not.
fn is_trusted(host: &str) -> bool {
    TRUSTED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

// ── Tests ──────────────────────────────────────────────────────────────────
