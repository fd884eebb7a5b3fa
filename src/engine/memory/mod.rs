// Compass Core — Memory Store
//
// Adapter over the external long-term memory service, scoped per user.
// All operations are best-effort: transport failures are caught, logged,
// and converted to empty/None results — never propagated — because memory
// is a personalization side-channel that must not break the reply path.
//
// Module layout:
//   backend.rs — MemoryBackend trait + HTTP implementation (errors surface)
//   mod.rs     — MemoryService (best-effort wrappers), insight extraction,
//                personalized context & greeting

pub mod backend;

pub use backend::{HttpMemoryBackend, MemoryBackend};

use std::sync::Arc;
use std::sync::OnceLock;

use chrono::Utc;
use log::{info, warn};
use regex::Regex;

use crate::atoms::types::{MemoryCategory, MemoryEntry, MemoryMetadata, PersonalizedContext};

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

const EXTRACTION_SOURCE: &str = "conversation_extraction";

const GENERIC_GREETING: &str =
    "Hi! I'm Compass. Tell me a bit about yourself and what you're looking for, \
     and I'll help you find research and internship opportunities.";

const GENERIC_RETURNING: &str = "Welcome back! What can I help you with today?";

/// Year-level tokens recognized in stored profile entries.
const YEAR_TOKENS: &[&str] = &[
    "freshman", "sophomore", "junior", "senior",
    "first-year", "first year", "second-year", "second year",
    "third-year", "third year", "fourth-year", "fourth year",
    "graduate", "phd", "master",
];

#[derive(Clone)]
pub struct MemoryService {
    backend: Arc<dyn MemoryBackend>,
}

impl MemoryService {
    pub fn new(backend: Arc<dyn MemoryBackend>) -> Self {
        MemoryService { backend }
    }

    // ── Best-effort CRUD ───────────────────────────────────────────────

    /// Store an entry. None on any backend failure.
    pub async fn add_memory(&self, entry: MemoryEntry) -> Option<String> {
        match self.backend.add(&entry).await {
            Ok(id) => {
                info!("[memory] Stored {} entry for user {}", entry.category.as_str(), entry.user_id);
                Some(id)
            }
            Err(e) => {
                warn!("[memory] add failed for user {} — degrading: {e}", entry.user_id);
                None
            }
        }
    }

    /// All memories for a user. Empty on failure.
    pub async fn get_user_memories(&self, user_id: &str) -> Vec<MemoryEntry> {
        match self.backend.list(user_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("[memory] list failed for user {user_id} — returning empty: {e}");
                Vec::new()
            }
        }
    }

    /// Query-based search when a query is present, else list-all (truncated).
    /// Empty on failure.
    pub async fn search_memories(
        &self,
        user_id: &str,
        query: Option<&str>,
        limit: usize,
    ) -> Vec<MemoryEntry> {
        let result = match query {
            Some(q) if !q.trim().is_empty() => self.backend.search(user_id, q, limit).await,
            _ => self.backend.list(user_id).await.map(|mut all| {
                all.truncate(limit);
                all
            }),
        };
        match result {
            Ok(entries) => entries,
            Err(e) => {
                warn!("[memory] search failed for user {user_id} — returning empty: {e}");
                Vec::new()
            }
        }
    }

    /// False on failure; callers branch on the boolean, nothing throws.
    pub async fn update_memory(&self, id: &str, content: &str) -> bool {
        match self.backend.update(id, content).await {
            Ok(()) => true,
            Err(e) => {
                warn!("[memory] update {id} failed: {e}");
                false
            }
        }
    }

    pub async fn delete_memory(&self, id: &str) -> bool {
        match self.backend.delete(id).await {
            Ok(()) => true,
            Err(e) => {
                warn!("[memory] delete {id} failed: {e}");
                false
            }
        }
    }

    // ── Personalized context ───────────────────────────────────────────

    /// Partition a user's memories for prompt assembly. Total and
    /// side-effect-free on error: any failure yields the all-empty context.
    pub async fn build_personalized_context(&self, user_id: &str) -> PersonalizedContext {
        let memories = self.get_user_memories(user_id).await;
        let mut ctx = PersonalizedContext::default();

        for entry in memories {
            match entry.category {
                MemoryCategory::Profile => ctx.profile.push(entry),
                MemoryCategory::Interests => ctx.recent_interests.push(entry),
                MemoryCategory::Goals => ctx.goals.push(entry),
                MemoryCategory::Preferences => ctx.preferences.push(entry),
                MemoryCategory::Interactions | MemoryCategory::Progress => {
                    ctx.recent_interactions.push(entry)
                }
            }
        }

        // Newest first; RFC 3339 strings sort lexicographically.
        ctx.recent_interests
            .sort_by(|a, b| b.metadata.timestamp.cmp(&a.metadata.timestamp));
        ctx.recent_interests.truncate(5);
        ctx.recent_interactions
            .sort_by(|a, b| b.metadata.timestamp.cmp(&a.metadata.timestamp));
        ctx.recent_interactions.truncate(3);

        ctx
    }

    // ── Insight extraction ─────────────────────────────────────────────

    /// Run the extraction heuristics over one user message and write every
    /// extracted entry. Writes are fire-and-forget (failures logged by
    /// `add_memory`). Returns the extracted entries for observability.
    pub async fn extract_conversation_insights(
        &self,
        user_id: &str,
        message: &str,
    ) -> Vec<MemoryEntry> {
        let entries = extract_insights(user_id, message);
        if entries.is_empty() {
            return entries;
        }
        info!("[memory] Extracted {} insight(s) from message for user {user_id}", entries.len());
        for entry in &entries {
            self.add_memory(entry.clone()).await;
        }
        entries
    }

    // ── Personalized greeting ──────────────────────────────────────────

    /// Greeting for a returning user. Collapses to the generic first-time
    /// text whenever no profile is available (including on any internal
    /// failure — the context builder already degrades to all-empty).
    pub async fn generate_personalized_greeting(&self, user_id: &str) -> String {
        let ctx = self.build_personalized_context(user_id).await;

        if ctx.profile.is_empty() {
            return GENERIC_GREETING.to_string();
        }

        let interest = ctx.recent_interests.first().map(|e| e.content.clone());
        let year = ctx
            .profile
            .iter()
            .find_map(|e| year_token_in(&e.content.to_lowercase()));

        if let Some(year) = year {
            return match interest {
                Some(i) => format!(
                    "Welcome back! How's {year} year going? Still exploring {i}?"
                ),
                None => format!("Welcome back! How's {year} year going?"),
            };
        }

        match interest {
            Some(i) => format!("Welcome back! Want to dive back into {i}?"),
            None => GENERIC_RETURNING.to_string(),
        }
    }
}

fn year_token_in(text: &str) -> Option<&'static str> {
    YEAR_TOKENS.iter().find(|t| text.contains(*t)).copied()
}

// ── Extraction heuristics (pure) ───────────────────────────────────────────

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:i am|i'm|im)\s+an?\s+(?:freshman|sophomore|junior|senior|(?:first|second|third|fourth)[- ]year|grad(?:uate)?\s+student|phd\s+student|master'?s\s+student)\b",
        )
        .expect("year regex")
    })
}

fn interest_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:interested in|majoring in|studying)\s+([a-z][a-z0-9 /&'-]*?)\s*(?:\band\b|\bbut\b|[,.!?;:]|$)",
        )
        .expect("interest regex")
    })
}

const GOAL_PHRASES: &[&str] = &[
    "want to", "plan to", "planning to", "looking for", "hope to", "hoping to", "my goal",
];

/// Extraction heuristics over one message. Independent triggers, each may
/// add 0..N entries; the goal trigger stores the entire raw message and
/// fires at most once per call.
pub fn extract_insights(user_id: &str, message: &str) -> Vec<MemoryEntry> {
    let lower = message.to_lowercase();
    let mut entries = Vec::new();

    let entry = |content: String, category: MemoryCategory, confidence: f64| MemoryEntry {
        id: None,
        content,
        category,
        user_id: user_id.to_string(),
        metadata: MemoryMetadata {
            source: EXTRACTION_SOURCE.to_string(),
            confidence,
            timestamp: Utc::now().to_rfc3339(),
        },
    };

    // Profile/interest/international patterns — all independent, all may fire.
    if year_re().is_match(message) {
        entries.push(entry(message.to_string(), MemoryCategory::Profile, 0.8));
    }
    if let Some(caps) = interest_re().captures(message) {
        if let Some(subject) = caps.get(1) {
            let subject = subject.as_str().trim();
            if !subject.is_empty() {
                entries.push(entry(subject.to_string(), MemoryCategory::Interests, 0.8));
            }
        }
    }
    if lower.contains("international student") {
        entries.push(entry(message.to_string(), MemoryCategory::Profile, 0.8));
    }

    // Goals: the whole raw message, at most one entry per call.
    if GOAL_PHRASES.iter().any(|p| lower.contains(p)) {
        entries.push(entry(message.to_string(), MemoryCategory::Goals, 0.7));
    }

    // Interaction-style preferences.
    if lower.contains("thank") || lower.contains("helpful") {
        entries.push(entry(
            "Responds well to thorough, concrete answers".to_string(),
            MemoryCategory::Preferences,
            0.6,
        ));
    }
    if ["haha", "lol", "lmao", "😂", "🤣"].iter().any(|m| lower.contains(m)) {
        entries.push(entry(
            "Enjoys a lighthearted, humorous tone".to_string(),
            MemoryCategory::Preferences,
            0.7,
        ));
    }

    entries
}

// ── Tests ──────────────────────────────────────────────────────────────────
