use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection};

use super::ConversationStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{Conversation, StudentProfile};
use crate::engine::continuity::within_idle_window;

const CONVERSATION_COLUMNS: &str =
    "id, user_id, session_id, is_active, message_count, extracted_profile, \
     created_at, updated_at, last_message_at";

impl Conversation {
    /// Map a row with CONVERSATION_COLUMNS → Conversation.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let is_active: i64 = row.get(3)?;
        let profile_json: Option<String> = row.get(5)?;
        Ok(Conversation {
            id: row.get(0)?,
            user_id: row.get(1)?,
            session_id: row.get(2)?,
            is_active: is_active != 0,
            message_count: row.get(4)?,
            extracted_profile: profile_json
                .as_deref()
                .and_then(|j| serde_json::from_str(j).ok()),
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            last_message_at: row.get(8)?,
        })
    }
}

impl ConversationStore {
    // ── Conversation CRUD ──────────────────────────────────────────────

    pub fn get_conversation(&self, id: &str) -> EngineResult<Option<Conversation>> {
        let conn = self.conn.lock();
        let result = conn.query_row(
            &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
            params![id],
            Conversation::from_row,
        );
        match result {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List a user's conversations, most recent activity first.
    pub fn list_conversations(&self, user_id: &str, limit: usize) -> EngineResult<Vec<Conversation>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE user_id = ?1 ORDER BY last_message_at DESC LIMIT ?2"
        ))?;
        let conversations = stmt
            .query_map(params![user_id, limit as i64], Conversation::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(conversations)
    }

    /// The user's active conversation, if any.
    pub fn find_active_conversation(&self, user_id: &str) -> EngineResult<Option<Conversation>> {
        let conn = self.conn.lock();
        Ok(active_for_user(&conn, user_id)?)
    }

    /// Attach a distilled profile snapshot to a conversation.
    pub fn set_extracted_profile(&self, id: &str, profile: &StudentProfile) -> EngineResult<()> {
        let conn = self.conn.lock();
        let json = serde_json::to_string(profile)?;
        conn.execute(
            "UPDATE conversations SET extracted_profile = ?1, updated_at = ?2 WHERE id = ?3",
            params![json, Utc::now().to_rfc3339(), id],
        )?;
        Ok(())
    }

    // ── Append-or-rotate transition ────────────────────────────────────

    /// The continuity transition, executed under a single lock acquisition.
    ///
    /// If the user's active conversation saw a message less than the idle
    /// window ago: bump its counters and return it. Otherwise deactivate it
    /// (terminal for that record) and open a fresh conversation with a new
    /// session id and message_count = 1. Returns the conversation and
    /// whether a new one was created.
    pub fn create_or_rotate(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<(Conversation, bool)> {
        let conn = self.conn.lock();
        let now_str = now.to_rfc3339();

        if let Some(mut active) = active_for_user(&conn, user_id)? {
            if within_idle_window(&active.last_message_at, now) {
                conn.execute(
                    "UPDATE conversations
                     SET message_count = message_count + 1, last_message_at = ?1, updated_at = ?1
                     WHERE id = ?2",
                    params![now_str, active.id],
                )?;
                active.message_count += 1;
                active.last_message_at = now_str.clone();
                active.updated_at = now_str;
                return Ok((active, false));
            }

            conn.execute(
                "UPDATE conversations SET is_active = 0, updated_at = ?1 WHERE id = ?2",
                params![now_str, active.id],
            )?;
            info!(
                "[store] Conversation {} for user {} expired — rotating",
                active.id, user_id
            );
        }

        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
            is_active: true,
            message_count: 1,
            extracted_profile: None,
            created_at: now_str.clone(),
            updated_at: now_str.clone(),
            last_message_at: now_str,
        };
        conn.execute(
            "INSERT INTO conversations
             (id, user_id, session_id, is_active, message_count, created_at, updated_at, last_message_at)
             VALUES (?1, ?2, ?3, 1, 1, ?4, ?4, ?4)",
            params![
                conversation.id,
                conversation.user_id,
                conversation.session_id,
                conversation.created_at
            ],
        )?;
        Ok((conversation, true))
    }
}

/// Most recent active conversation for a user, queried on an already-held
/// connection so the caller can keep the check-then-act atomic.
fn active_for_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<Conversation>> {
    let result = conn.query_row(
        &format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE user_id = ?1 AND is_active = 1
             ORDER BY last_message_at DESC LIMIT 1"
        ),
        params![user_id],
        Conversation::from_row,
    );
    match result {
        Ok(c) => Ok(Some(c)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}
