// Compass Core — Conversation Store
// Stores conversations and messages in SQLite via rusqlite.
//
// Module layout:
//   schema         — idempotent migrations, run once at open
//   conversations  — conversation CRUD + the append-or-rotate transition
//   messages       — append-only message records + aggregates
//
// The single `parking_lot::Mutex<Connection>` is what serializes the
// continuity manager's read-check-deactivate-create sequence: the whole
// transition happens under one lock acquisition, so two concurrent
// messages can never both open a new conversation for the same user.

use std::path::Path;

use log::info;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::atoms::error::EngineResult;

mod conversations;
mod messages;
mod schema;

/// Thread-safe database wrapper.
pub struct ConversationStore {
    /// The SQLite connection, protected by a Mutex.
    conn: Mutex<Connection>,
}

impl ConversationStore {
    /// Open (or create) the database at `path` and initialize tables.
    pub fn open(path: &Path) -> EngineResult<Self> {
        info!("[store] Opening conversation store at {:?}", path);
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
        conn.execute_batch("PRAGMA foreign_keys=ON;").ok();
        schema::run_migrations(&conn)?;
        Ok(ConversationStore { conn: Mutex::new(conn) })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;").ok();
        schema::run_migrations(&conn)?;
        Ok(ConversationStore { conn: Mutex::new(conn) })
    }
}
