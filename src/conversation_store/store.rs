//! SQLite-backed conversation store implementation.

use super::models::{Conversation, Message, MessageRole};
use super::trait_def::ConversationStore;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);
";

/// SQLite-backed conversation store.
///
/// Writes go through a single mutex-guarded connection, so concurrent
/// requests never race on the underlying file; reads use a separate
/// connection against the same WAL database.
#[derive(Clone)]
pub struct SqliteConversationStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
}

impl SqliteConversationStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open conversation database")?;

        write_conn
            .execute_batch(SCHEMA)
            .context("Failed to create conversation schema")?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on write connection")?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open conversation database for reading")?;

        read_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on read connection")?;

        let count: usize =
            read_conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?;
        info!("Conversation store ready: {} conversation(s)", count);

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
        })
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl ConversationStore for SqliteConversationStore {
    fn create_conversation(&self, title: Option<&str>) -> Result<Conversation> {
        let created_at = Self::now_millis();
        let title = match title {
            Some(t) => t.to_string(),
            None => format!("Conversation {}", created_at),
        };

        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO conversations (title, created_at) VALUES (?1, ?2)",
            params![title, created_at],
        )?;

        Ok(Conversation {
            id: conn.last_insert_rowid(),
            title,
            created_at,
        })
    }

    fn insert_message(
        &self,
        conversation_id: i64,
        role: MessageRole,
        content: &str,
    ) -> Result<Message> {
        let created_at = Self::now_millis();

        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT INTO messages (conversation_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![conversation_id, role.as_str(), content, created_at],
        )?;

        Ok(Message {
            id: conn.last_insert_rowid(),
            conversation_id,
            role,
            content: content.to_string(),
            created_at,
        })
    }

    fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, created_at FROM conversations
             ORDER BY created_at DESC, id DESC",
        )?;
        let conversations = stmt
            .query_map([], |row| {
                Ok(Conversation {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conversations)
    }

    fn get_messages(&self, conversation_id: i64) -> Result<Vec<Message>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, conversation_id, role, content, created_at FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let messages = stmt
            .query_map(params![conversation_id], |row| {
                let role: String = row.get(2)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    role,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        messages
            .into_iter()
            .map(|(id, conversation_id, role, content, created_at)| {
                let role = MessageRole::parse(&role)
                    .ok_or_else(|| anyhow!("unknown message role in db: {}", role))?;
                Ok(Message {
                    id,
                    conversation_id,
                    role,
                    content,
                    created_at,
                })
            })
            .collect()
    }

    fn delete_conversation(&self, conversation_id: i64) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![conversation_id],
        )?;
        tx.execute(
            "DELETE FROM conversations WHERE id = ?1",
            params![conversation_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}
