use std::sync::Mutex;

use chrono::SecondsFormat;
use cyberchat_core::types::Role;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::types::{Conversation, Message, NewMessage};

/// Data-access handle for conversations and their messages.
///
/// Wraps a single SQLite connection in a `Mutex`; constructed once at
/// startup and shared through the gateway's state.
pub struct ConversationStore {
    db: Mutex<Connection>,
}

impl ConversationStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    /// Open a private in-memory database with the schema applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        crate::db::init_db(&conn)?;
        Ok(Self::new(conn))
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        // a poisoned lock only means another handler panicked mid-query;
        // the connection itself is still usable
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create a conversation, optionally seeded with its first message.
    #[instrument(skip(self, initial))]
    pub fn create(&self, title: &str, initial: Option<NewMessage>) -> Result<Conversation> {
        let role = initial.as_ref().map(|m| parse_role(&m.role)).transpose()?;

        let id = Uuid::now_v7().to_string();
        let now = timestamp();
        let mut db = self.conn();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO conversations (id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            rusqlite::params![id, title, now],
        )?;

        let mut messages = Vec::new();
        if let (Some(msg), Some(role)) = (initial, role) {
            messages.push(insert_message(&tx, &id, role, msg, &now)?);
        }
        tx.commit()?;

        debug!(%id, "conversation created");
        Ok(Conversation {
            id,
            title: title.to_string(),
            created_at: now.clone(),
            updated_at: now,
            messages,
        })
    }

    /// All conversations, most recently updated first, each carrying only
    /// its earliest message as a preview.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<Conversation>> {
        let db = self.conn();
        let mut stmt = db.prepare(
            "SELECT id, title, created_at, updated_at
             FROM conversations
             ORDER BY updated_at DESC, rowid DESC",
        )?;
        let mut conversations = stmt
            .query_map([], row_to_conversation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut preview = db.prepare(
            "SELECT id, conversation_id, role, content, plugin_used, created_at
             FROM messages WHERE conversation_id = ?1
             ORDER BY created_at ASC, rowid ASC LIMIT 1",
        )?;
        for conv in &mut conversations {
            conv.messages = preview
                .query_map(rusqlite::params![conv.id], row_to_message)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
        }
        Ok(conversations)
    }

    /// One conversation with every message, oldest first.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Result<Conversation> {
        let db = self.conn();
        let mut conv = find_conversation(&db, id)?;
        conv.messages = load_messages(&db, id)?;
        Ok(conv)
    }

    /// Change a conversation's title. Returned without messages.
    #[instrument(skip(self))]
    pub fn rename(&self, id: &str, title: &str) -> Result<Conversation> {
        let db = self.conn();
        let changed = db.execute(
            "UPDATE conversations SET title = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![title, timestamp(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        find_conversation(&db, id)
    }

    /// Permanently delete a conversation and its messages.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut db = self.conn();
        let tx = db.transaction()?;
        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            rusqlite::params![id],
        )?;
        let changed = tx.execute("DELETE FROM conversations WHERE id = ?1", rusqlite::params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        tx.commit()?;
        Ok(())
    }

    /// Every message of a conversation, oldest first.
    #[instrument(skip(self))]
    pub fn messages(&self, id: &str) -> Result<Vec<Message>> {
        let db = self.conn();
        find_conversation(&db, id)?;
        load_messages(&db, id)
    }

    /// Append a message and bump the conversation's `updated_at`.
    #[instrument(skip(self, msg), fields(role = %msg.role))]
    pub fn add_message(&self, id: &str, msg: NewMessage) -> Result<Message> {
        let role = parse_role(&msg.role)?;
        let now = timestamp();
        let mut db = self.conn();
        let tx = db.transaction()?;
        let changed = tx.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            rusqlite::params![now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        let message = insert_message(&tx, id, role, msg, &now)?;
        tx.commit()?;
        Ok(message)
    }
}

fn parse_role(role: &str) -> Result<Role> {
    role.parse::<Role>()
        .map_err(|_| StoreError::InvalidRole(role.to_string()))
}

/// Fixed-width UTC timestamps keep lexical and chronological order equal.
fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn insert_message(
    conn: &Connection,
    conversation_id: &str,
    role: Role,
    msg: NewMessage,
    now: &str,
) -> Result<Message> {
    let id = Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO messages (id, conversation_id, role, content, plugin_used, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![id, conversation_id, role.as_str(), msg.content, msg.plugin_used, now],
    )?;
    Ok(Message {
        id,
        conversation_id: conversation_id.to_string(),
        content: msg.content,
        role,
        plugin_used: msg.plugin_used,
        created_at: now.to_string(),
    })
}

fn find_conversation(conn: &Connection, id: &str) -> Result<Conversation> {
    conn.query_row(
        "SELECT id, title, created_at, updated_at FROM conversations WHERE id = ?1",
        rusqlite::params![id],
        row_to_conversation,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
}

fn load_messages(conn: &Connection, conversation_id: &str) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, role, content, plugin_used, created_at
         FROM messages WHERE conversation_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map(rusqlite::params![conversation_id], row_to_message)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Map a SQLite row to a `Conversation` (messages filled in separately).
fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        messages: Vec::new(),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get(2)?;
    // rows are only written through `parse_role`; anything else is treated
    // as assistant output rather than failing the whole listing
    let role = role.parse::<Role>().unwrap_or(Role::Assistant);
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role,
        content: row.get(3)?,
        plugin_used: row.get(4)?,
        created_at: row.get(5)?,
    })
}
