//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.

/// Conversations table schema
pub mod conversations {
    /// Table name
    pub const TABLE: &str = "conversations";
    /// Primary key column (opaque export identifier)
    pub const ID: &str = "conversation_id";
    /// Display name column
    pub const NAME: &str = "conversation_name";
}

/// Messages table schema
pub mod messages {
    /// Table name
    pub const TABLE: &str = "messages";
    /// Primary key column (opaque export identifier)
    pub const ID: &str = "message_id";
    /// Foreign key to the conversations table
    pub const CONVERSATION_ID: &str = "conversation_id";
    /// Author role column ("user", "assistant", ...)
    pub const AUTHOR_ROLE: &str = "author_role";
    /// Markdown message body column
    pub const CONTENT: &str = "content";
    /// String-encoded creation timestamp column; the message sort key
    pub const CREATE_TIME: &str = "create_time";
}
