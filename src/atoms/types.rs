// Compass Core — domain types
// These are the data structures that flow through the entire engine.
// Classification, SearchHit and CommandEvent are ephemeral (computed per
// call); Conversation, ChatMessage and MemoryEntry are persisted.

use serde::{Deserialize, Serialize};

// ── Conversations & messages ───────────────────────────────────────────────

/// A bounded message sequence for one user. Opened and closed by the
/// session continuity manager; at most one row per user has
/// `is_active == true` at any instant. Deactivated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub session_id: String,
    pub is_active: bool,
    pub message_count: i64,
    pub created_at: String,
    pub updated_at: String,
    pub last_message_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_profile: Option<StudentProfile>,
}

/// Profile snapshot distilled from a conversation, stored alongside it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }

    /// Map a stored role string back to the enum. Unknown values (from a
    /// future schema) read back as System so they never impersonate a user.
    pub fn from_db(s: &str) -> Self {
        match s {
            "user" => ChatRole::User,
            "assistant" => ChatRole::Assistant,
            _ => ChatRole::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<i64>,
    /// Opportunity the message referenced, when the reply was grounded in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_id: Option<String>,
}

// ── Long-term memory ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryCategory {
    Profile,
    Interests,
    Goals,
    Preferences,
    Interactions,
    Progress,
}

impl MemoryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Profile => "profile",
            MemoryCategory::Interests => "interests",
            MemoryCategory::Goals => "goals",
            MemoryCategory::Preferences => "preferences",
            MemoryCategory::Interactions => "interactions",
            MemoryCategory::Progress => "progress",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMetadata {
    pub source: String,
    pub confidence: f64,
    pub timestamp: String,
}

/// A durable categorized personalization fact about a user, independent of
/// any transcript. Created by extraction heuristics or an explicit save;
/// no expiry policy in the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub category: MemoryCategory,
    pub user_id: String,
    pub metadata: MemoryMetadata,
}

/// Partitioned view of a user's memories for prompt assembly.
#[derive(Debug, Clone, Default)]
pub struct PersonalizedContext {
    pub profile: Vec<MemoryEntry>,
    pub recent_interests: Vec<MemoryEntry>,
    pub goals: Vec<MemoryEntry>,
    pub preferences: Vec<MemoryEntry>,
    pub recent_interactions: Vec<MemoryEntry>,
}

// ── Classification ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    SimpleGreeting,
    Acknowledgment,
    ProfileSharing,
    GoalSetting,
    OpportunityRequest,
    SubstantiveQuestion,
    FollowUp,
}

/// Output of the intent classifier. Pure, total — never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub kind: MessageKind,
    pub confidence: f64,
    pub should_process_memory: bool,
    pub reasoning: String,
}

// ── Retrieval ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    Basic,
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub include_answer: bool,
    pub max_results: usize,
    pub depth: SearchDepth,
    pub include_raw_content: bool,
    pub exclude_domains: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            include_answer: false,
            max_results: crate::atoms::constants::DEFAULT_MAX_RESULTS,
            depth: SearchDepth::Basic,
            include_raw_content: false,
            exclude_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_domain: Option<String>,
    pub is_official: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// The rewritten query that was actually executed.
    pub query: String,
    pub confidence: f64,
}

// ── Slash commands ─────────────────────────────────────────────────────────

/// Structured message a command handler emits toward the chat surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandEvent {
    /// `/search <q>` — the caller should run a grounded search for `query`.
    SearchIntent { query: String },
    /// Fixed instructional text (e.g. `/help`).
    Notice { text: String },
    /// `/save` — persist what the assistant knows about the user so far.
    SaveProfile,
}
