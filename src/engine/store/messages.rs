use rusqlite::params;

use super::ConversationStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{ChatMessage, ChatRole};

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, user_id, role, content, model, tokens_used, \
     response_time_ms, opportunity_id, created_at";

impl ChatMessage {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let role: String = row.get(3)?;
        Ok(ChatMessage {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            user_id: row.get(2)?,
            role: ChatRole::from_db(&role),
            content: row.get(4)?,
            model: row.get(5)?,
            tokens_used: row.get(6)?,
            response_time_ms: row.get(7)?,
            opportunity_id: row.get(8)?,
            created_at: row.get(9)?,
        })
    }
}

impl ConversationStore {
    // ── Message records (append-only) ──────────────────────────────────

    pub fn append_message(&self, message: &ChatMessage) -> EngineResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO messages ({MESSAGE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
            ),
            params![
                message.id,
                message.conversation_id,
                message.user_id,
                message.role.as_str(),
                message.content,
                message.model,
                message.tokens_used,
                message.response_time_ms,
                message.opportunity_id,
                message.created_at,
            ],
        )?;
        Ok(())
    }

    /// Messages for a conversation, oldest first.
    pub fn list_messages(&self, conversation_id: &str, limit: usize) -> EngineResult<Vec<ChatMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?1 ORDER BY created_at ASC LIMIT ?2"
        ))?;
        let messages = stmt
            .query_map(params![conversation_id, limit as i64], ChatMessage::from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(messages)
    }

    pub fn count_messages(&self, conversation_id: &str) -> EngineResult<i64> {
        let conn = self.conn.lock();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    /// Count-weighted mean of stored response-time samples for a
    /// conversation. None when no assistant message carried a sample.
    pub fn average_response_time(&self, conversation_id: &str) -> EngineResult<Option<f64>> {
        let conn = self.conn.lock();
        let avg = conn.query_row(
            "SELECT AVG(response_time_ms) FROM messages
             WHERE conversation_id = ?1 AND response_time_ms IS NOT NULL",
            params![conversation_id],
            |r| r.get::<_, Option<f64>>(0),
        )?;
        Ok(avg)
    }
}
