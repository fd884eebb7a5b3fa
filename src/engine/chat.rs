// ── Compass: Chat Turn Orchestration ───────────────────────────────────────
//
// One inbound message, end to end:
//   1. Command dispatch — a recognized slash command short-circuits the
//      turn; nothing is classified or persisted.
//   2. Classification (synchronous, instant).
//   3. Continuity — attach to or rotate the user's conversation, persist
//      the user message.
//   4. If the classifier says the message is memory-worthy, insight
//      extraction runs in the background under a hard timeout; a slow or
//      failing memory service degrades silently.
//
// The reply itself (LLM call) is the caller's job; search is invoked on
// demand via engine::search, not from here.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::warn;

use crate::atoms::constants::MEMORY_TIMEOUT_SECS;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{ChatMessage, ChatRole, Classification, CommandEvent, Conversation};
use crate::engine::classifier::{classify, skip_memory};
use crate::engine::commands::CommandRegistry;
use crate::engine::continuity::SessionContinuity;
use crate::engine::memory::{MemoryBackend, MemoryService};
use crate::engine::store::ConversationStore;

/// What a turn produced. Either the message was consumed as a command
/// (`command` set, nothing persisted) or it went through the pipeline
/// (`conversation` + `classification` set).
#[derive(Debug)]
pub struct TurnOutcome {
    pub consumed_by_command: bool,
    pub command: Option<CommandEvent>,
    pub conversation: Option<Conversation>,
    pub classification: Option<Classification>,
}

pub struct ChatEngine {
    store: Arc<ConversationStore>,
    continuity: SessionContinuity,
    memory: MemoryService,
    registry: Arc<CommandRegistry>,
}

impl ChatEngine {
    pub fn new(store: Arc<ConversationStore>, memory_backend: Arc<dyn MemoryBackend>) -> Self {
        ChatEngine {
            continuity: SessionContinuity::new(Arc::clone(&store)),
            store,
            memory: MemoryService::new(memory_backend),
            registry: Arc::new(CommandRegistry::with_builtins()),
        }
    }

    pub fn registry(&self) -> Arc<CommandRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn memory(&self) -> &MemoryService {
        &self.memory
    }

    /// Process one inbound user message.
    pub async fn handle_turn(&self, user_id: &str, text: &str) -> EngineResult<TurnOutcome> {
        let dispatch = self.registry.dispatch(text);
        if dispatch.consumed {
            return Ok(TurnOutcome {
                consumed_by_command: true,
                command: dispatch.event,
                conversation: None,
                classification: None,
            });
        }

        let classification = classify(text);
        let conversation = self.continuity.create_or_update(user_id)?;

        self.store.append_message(&ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            user_id: user_id.to_string(),
            role: ChatRole::User,
            content: text.to_string(),
            created_at: Utc::now().to_rfc3339(),
            model: None,
            tokens_used: None,
            response_time_ms: None,
            opportunity_id: None,
        })?;

        if !skip_memory(&classification) {
            let memory = self.memory.clone();
            let user = user_id.to_string();
            let message = text.to_string();
            tokio::spawn(async move {
                let work = memory.extract_conversation_insights(&user, &message);
                if tokio::time::timeout(Duration::from_secs(MEMORY_TIMEOUT_SECS), work)
                    .await
                    .is_err()
                {
                    warn!("[chat] Memory extraction timed out for user {user} — skipped");
                }
            });
        }

        Ok(TurnOutcome {
            consumed_by_command: false,
            command: None,
            conversation: Some(conversation),
            classification: Some(classification),
        })
    }

    /// Persist the assistant's reply for a turn.
    pub fn record_assistant_reply(
        &self,
        conversation_id: &str,
        user_id: &str,
        content: &str,
        model: Option<&str>,
        tokens_used: Option<i64>,
        response_time_ms: Option<i64>,
    ) -> EngineResult<ChatMessage> {
        let message = ChatMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            role: ChatRole::Assistant,
            content: content.to_string(),
            created_at: Utc::now().to_rfc3339(),
            model: model.map(|m| m.to_string()),
            tokens_used,
            response_time_ms,
            opportunity_id: None,
        };
        self.store.append_message(&message)?;
        Ok(message)
    }

    /// Count-weighted mean response time over a conversation's samples.
    pub fn average_response_time(&self, conversation_id: &str) -> EngineResult<Option<f64>> {
        self.store.average_response_time(conversation_id)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::EngineResult;
    use crate::atoms::types::{MemoryEntry, MessageKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct RecordingBackend {
        entries: Mutex<Vec<MemoryEntry>>,
    }

    #[async_trait]
    impl MemoryBackend for RecordingBackend {
        async fn add(&self, entry: &MemoryEntry) -> EngineResult<String> {
            self.entries.lock().push(entry.clone());
            Ok("mem-1".into())
        }

        async fn list(&self, _user_id: &str) -> EngineResult<Vec<MemoryEntry>> {
            Ok(self.entries.lock().clone())
        }

        async fn search(&self, _u: &str, _q: &str, _l: usize) -> EngineResult<Vec<MemoryEntry>> {
            Ok(Vec::new())
        }

        async fn update(&self, _id: &str, _content: &str) -> EngineResult<()> {
            Ok(())
        }

        async fn delete(&self, _id: &str) -> EngineResult<()> {
            Ok(())
        }
    }

    fn engine() -> (ChatEngine, Arc<RecordingBackend>) {
        let store = Arc::new(ConversationStore::open_in_memory().expect("store"));
        let backend = Arc::new(RecordingBackend { entries: Mutex::new(Vec::new()) });
        (ChatEngine::new(store, Arc::clone(&backend) as Arc<dyn MemoryBackend>), backend)
    }

    #[tokio::test]
    async fn slash_command_short_circuits_the_turn() {
        let (eng, _) = engine();
        let outcome = eng.handle_turn("stu-1", "/search quantum computing labs").await.unwrap();
        assert!(outcome.consumed_by_command);
        assert_eq!(
            outcome.command,
            Some(CommandEvent::SearchIntent { query: "quantum computing labs".into() })
        );
        assert!(outcome.conversation.is_none());
        assert!(outcome.classification.is_none());
    }

    #[tokio::test]
    async fn unknown_command_flows_through_as_chat() {
        let (eng, _) = engine();
        let outcome = eng.handle_turn("stu-1", "/unknowncmd foo").await.unwrap();
        assert!(!outcome.consumed_by_command);
        let conversation = outcome.conversation.expect("conversation attached");
        assert_eq!(conversation.message_count, 1);
        assert_eq!(eng.store.count_messages(&conversation.id).unwrap(), 1);
    }

    #[tokio::test]
    async fn consecutive_turns_share_a_conversation() {
        let (eng, _) = engine();
        let first = eng.handle_turn("stu-1", "hello!").await.unwrap();
        let second = eng.handle_turn("stu-1", "any deadlines for REU applications?").await.unwrap();

        let a = first.conversation.unwrap();
        let b = second.conversation.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.message_count, 2);

        let c = second.classification.unwrap();
        assert_eq!(c.kind, MessageKind::OpportunityRequest);
    }

    #[tokio::test]
    async fn memory_worthy_turn_reaches_the_backend() {
        let (eng, backend) = engine();
        eng.handle_turn("stu-1", "I am a sophomore interested in neuroscience").await.unwrap();

        // Extraction is spawned; give it a moment to land.
        for _ in 0..50 {
            if !backend.entries.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!backend.entries.lock().is_empty(), "expected extracted entries");
    }

    #[tokio::test]
    async fn greeting_skips_memory_work() {
        let (eng, backend) = engine();
        let outcome = eng.handle_turn("stu-1", "hey").await.unwrap();
        let c = outcome.classification.unwrap();
        assert_eq!(c.kind, MessageKind::SimpleGreeting);
        assert!(crate::engine::classifier::skip_memory(&c));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(backend.entries.lock().is_empty());
    }

    #[tokio::test]
    async fn assistant_replies_feed_the_response_time_mean() {
        let (eng, _) = engine();
        let outcome = eng.handle_turn("stu-1", "hello").await.unwrap();
        let conversation = outcome.conversation.unwrap();

        eng.record_assistant_reply(&conversation.id, "stu-1", "hi!", Some("gpt-4o"), Some(120), Some(400))
            .unwrap();
        eng.record_assistant_reply(&conversation.id, "stu-1", "more", Some("gpt-4o"), Some(80), Some(800))
            .unwrap();

        let avg = eng.average_response_time(&conversation.id).unwrap().unwrap();
        assert!((avg - 600.0).abs() < 1e-9);
    }
}
