use std::fs;
use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Result, SharedChatError};
use crate::models::{Conversation, NewMessage, StoreStats, StoredMessage};
use crate::schema::{conversations, messages};

// Type aliases for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Database manager for handling connections and operations.
///
/// Cloning is cheap: clones share the same underlying pool, and every
/// checkout is an independent connection handle. Background workers clone the
/// `Database` and check out their own connections instead of sharing one.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool and ensure the schema exists.
    ///
    /// Schema creation is idempotent; opening the same file twice is safe.
    pub fn new(database_path: &str) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(database_path);
        let pool = Pool::builder().build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2025-06-20-000000_create_tables/up.sql"
        ))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Insert or replace a conversation row; last writer wins.
    pub fn upsert_conversation(&self, id: &str, name: &str) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}, {}) VALUES (?1, ?2)",
                conversations::TABLE,
                conversations::ID,
                conversations::NAME
            ),
            params![id, name],
        )?;
        Ok(())
    }

    /// Get a conversation by id
    pub fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let conn = self.get_connection()?;
        let conversation = conn
            .query_row(
                &format!(
                    "SELECT {}, {} FROM {} WHERE {} = ?1",
                    conversations::ID,
                    conversations::NAME,
                    conversations::TABLE,
                    conversations::ID
                ),
                params![id],
                Self::map_conversation,
            )
            .optional()?;
        Ok(conversation)
    }

    /// Check whether a conversation row exists
    pub fn conversation_exists(&self, id: &str) -> Result<bool> {
        let conn = self.get_connection()?;
        let exists: bool = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
                conversations::TABLE,
                conversations::ID
            ),
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// List conversations, optionally filtered by a case-sensitive substring
    /// of the name.
    ///
    /// No ordering is guaranteed; display order is a presentation concern of
    /// the caller.
    pub fn list_conversations(&self, filter: Option<&str>) -> Result<Vec<Conversation>> {
        let conn = self.get_connection()?;

        // instr() keeps the match case-sensitive; LIKE would fold ASCII case
        let (query, filter_value) = match filter {
            Some(needle) if !needle.is_empty() => (
                format!(
                    "SELECT {}, {} FROM {} WHERE instr({}, ?1) > 0",
                    conversations::ID,
                    conversations::NAME,
                    conversations::TABLE,
                    conversations::NAME
                ),
                Some(needle),
            ),
            _ => (
                format!(
                    "SELECT {}, {} FROM {}",
                    conversations::ID,
                    conversations::NAME,
                    conversations::TABLE
                ),
                None,
            ),
        };

        let mut stmt = conn.prepare(&query)?;
        let rows = match filter_value {
            Some(needle) => stmt.query_map(params![needle], Self::map_conversation)?,
            None => stmt.query_map([], Self::map_conversation)?,
        };

        let mut results = Vec::new();
        for conversation in rows {
            results.push(conversation?);
        }
        Ok(results)
    }

    /// Update the display name of a conversation; other fields are untouched.
    pub fn rename_conversation(&self, id: &str, new_name: &str) -> Result<()> {
        let conn = self.get_connection()?;
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1 WHERE {} = ?2",
                conversations::TABLE,
                conversations::NAME,
                conversations::ID
            ),
            params![new_name, id],
        )?;
        if updated == 0 {
            return Err(SharedChatError::Storage(
                rusqlite::Error::QueryReturnedNoRows,
            ));
        }
        Ok(())
    }

    /// Delete a conversation and every message referencing it.
    ///
    /// Runs in a single transaction: either both deletes commit or neither.
    pub fn delete_conversation(&self, id: &str) -> Result<()> {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                messages::TABLE,
                messages::CONVERSATION_ID
            ),
            params![id],
        )?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1",
                conversations::TABLE,
                conversations::ID
            ),
            params![id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace a message by primary key; re-import is idempotent.
    pub fn upsert_message(&self, message: &NewMessage) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5)",
                messages::TABLE,
                messages::ID,
                messages::CONVERSATION_ID,
                messages::AUTHOR_ROLE,
                messages::CONTENT,
                messages::CREATE_TIME
            ),
            params![
                message.id,
                message.conversation_id,
                message.author_role,
                message.content,
                message.create_time
            ],
        )?;
        Ok(())
    }

    /// Fetch one page of messages for a conversation.
    ///
    /// Rows are ordered by `create_time` ascending with `message_id` as
    /// tiebreaker, so repeated calls over constant data always return the
    /// same window — the invariant pagination depends on.
    pub fn list_messages_page(
        &self,
        conversation_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMessage>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {}, {}, {}, {} FROM {} WHERE {} = ?1 \
             ORDER BY {} ASC, {} ASC LIMIT ?2 OFFSET ?3",
            messages::ID,
            messages::CONVERSATION_ID,
            messages::AUTHOR_ROLE,
            messages::CONTENT,
            messages::CREATE_TIME,
            messages::TABLE,
            messages::CONVERSATION_ID,
            messages::CREATE_TIME,
            messages::ID
        ))?;

        let rows = stmt.query_map(
            params![conversation_id, limit as i64, offset as i64],
            Self::map_message,
        )?;

        let mut results = Vec::new();
        for message in rows {
            results.push(message?);
        }
        Ok(results)
    }

    /// Fetch the full ordered transcript of a conversation
    pub fn transcript(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {}, {}, {}, {} FROM {} WHERE {} = ?1 ORDER BY {} ASC, {} ASC",
            messages::ID,
            messages::CONVERSATION_ID,
            messages::AUTHOR_ROLE,
            messages::CONTENT,
            messages::CREATE_TIME,
            messages::TABLE,
            messages::CONVERSATION_ID,
            messages::CREATE_TIME,
            messages::ID
        ))?;

        let rows = stmt.query_map(params![conversation_id], Self::map_message)?;

        let mut results = Vec::new();
        for message in rows {
            results.push(message?);
        }
        Ok(results)
    }

    /// Content of the earliest user-authored message in a conversation, if any.
    ///
    /// Feeds the title-suggestion excerpt.
    pub fn first_user_message(&self, conversation_id: &str) -> Result<Option<String>> {
        let conn = self.get_connection()?;
        let content = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {} = ?1 AND {} = 'user' \
                     ORDER BY {} ASC, {} ASC LIMIT 1",
                    messages::CONTENT,
                    messages::TABLE,
                    messages::CONVERSATION_ID,
                    messages::AUTHOR_ROLE,
                    messages::CREATE_TIME,
                    messages::ID
                ),
                params![conversation_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    /// Number of messages stored for a conversation
    pub fn count_messages(&self, conversation_id: &str) -> Result<usize> {
        let conn = self.get_connection()?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                messages::TABLE,
                messages::CONVERSATION_ID
            ),
            params![conversation_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Row counts for the whole store
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.get_connection()?;
        let conversation_count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", conversations::TABLE),
            [],
            |row| row.get(0),
        )?;
        let message_count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", messages::TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(StoreStats {
            conversations: conversation_count as usize,
            messages: message_count as usize,
        })
    }

    /// Map a database row to a Conversation
    fn map_conversation(row: &Row) -> rusqlite::Result<Conversation> {
        Ok(Conversation {
            id: row.get(0)?,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        })
    }

    /// Map a database row to a StoredMessage
    fn map_message(row: &Row) -> rusqlite::Result<StoredMessage> {
        Ok(StoredMessage {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            author_role: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            create_time: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        })
    }
}
