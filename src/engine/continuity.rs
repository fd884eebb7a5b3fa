// ── Compass: Session Continuity Manager ────────────────────────────────────
//
// Per user, a conversation is in one of three states: no active
// conversation, active within the idle window, or active but expired.
// Each inbound message either appends to the active conversation or
// rotates to a fresh one; the 30-minute idle window is fixed policy.
//
// The store runs the whole read-check-deactivate-create sequence under
// one connection lock (see store::conversations), which is what keeps the
// "at most one active conversation per user" invariant under concurrency.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::atoms::constants::IDLE_WINDOW_MINUTES;
use crate::atoms::error::EngineResult;
use crate::atoms::types::Conversation;
use crate::engine::store::ConversationStore;

/// Is the last-message timestamp still inside the idle window?
/// An unparseable timestamp reads as expired, which only costs a rotation.
pub fn within_idle_window(last_message_at: &str, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(last_message_at) {
        Ok(last) => {
            now.signed_duration_since(last.with_timezone(&Utc))
                < chrono::Duration::minutes(IDLE_WINDOW_MINUTES)
        }
        Err(e) => {
            warn!("[continuity] Unparseable last_message_at {last_message_at:?}: {e}");
            false
        }
    }
}

pub struct SessionContinuity {
    store: Arc<ConversationStore>,
}

impl SessionContinuity {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        SessionContinuity { store }
    }

    /// Attach the message to the user's active conversation, or open a new
    /// one if none exists or the active one has gone idle.
    pub fn create_or_update(&self, user_id: &str) -> EngineResult<Conversation> {
        self.create_or_update_at(user_id, Utc::now())
    }

    /// Same transition with an injected clock, for tests.
    pub fn create_or_update_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<Conversation> {
        let (conversation, created) = self.store.create_or_rotate(user_id, now)?;
        if created {
            info!(
                "[continuity] Opened conversation {} (session {}) for user {}",
                conversation.id, conversation.session_id, user_id
            );
        }
        Ok(conversation)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionContinuity {
        let store = Arc::new(ConversationStore::open_in_memory().expect("in-memory store"));
        SessionContinuity::new(store)
    }

    #[test]
    fn messages_within_window_share_a_conversation() {
        let m = manager();
        let t0 = Utc::now();
        let first = m.create_or_update_at("stu-1", t0).unwrap();
        assert!(first.is_active);
        assert_eq!(first.message_count, 1);

        let second = m
            .create_or_update_at("stu-1", t0 + chrono::Duration::minutes(10))
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.message_count, 2);

        let third = m
            .create_or_update_at("stu-1", t0 + chrono::Duration::minutes(20))
            .unwrap();
        assert_eq!(third.id, first.id);
        assert_eq!(third.message_count, 3);
    }

    #[test]
    fn idle_conversation_rotates() {
        let m = manager();
        let t0 = Utc::now();
        let first = m.create_or_update_at("stu-2", t0).unwrap();

        let later = m
            .create_or_update_at("stu-2", t0 + chrono::Duration::minutes(40))
            .unwrap();
        assert_ne!(later.id, first.id);
        assert_ne!(later.session_id, first.session_id);
        assert_eq!(later.message_count, 1);

        // The prior record was deactivated, not deleted.
        let prior = m.store.get_conversation(&first.id).unwrap().unwrap();
        assert!(!prior.is_active);
    }

    #[test]
    fn at_most_one_active_conversation_per_user() {
        let m = manager();
        let t0 = Utc::now();
        m.create_or_update_at("stu-3", t0).unwrap();
        m.create_or_update_at("stu-3", t0 + chrono::Duration::minutes(40)).unwrap();
        m.create_or_update_at("stu-3", t0 + chrono::Duration::minutes(90)).unwrap();

        let all = m.store.list_conversations("stu-3", 50).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.iter().filter(|c| c.is_active).count(), 1);
    }

    #[test]
    fn users_do_not_share_conversations() {
        let m = manager();
        let t0 = Utc::now();
        let a = m.create_or_update_at("stu-a", t0).unwrap();
        let b = m.create_or_update_at("stu-b", t0).unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.is_active && b.is_active);
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let now = Utc::now();
        let at = |mins: i64| (now - chrono::Duration::minutes(mins)).to_rfc3339();
        assert!(within_idle_window(&at(29), now));
        assert!(!within_idle_window(&at(30), now));
        assert!(!within_idle_window(&at(31), now));
        assert!(!within_idle_window("not-a-timestamp", now));
    }
}
