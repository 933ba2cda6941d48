//! Data models for conversation storage and import
//!
//! This module contains the data structures shared across the storage layer,
//! the import reconciler and the rendering engine.

use serde::{Deserialize, Serialize};

/// A stored conversation: a named, uniquely identified thread of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Opaque identifier from the chat export; primary key
    pub id: String,
    /// Display name; defaults to a placeholder when imported unattended
    pub name: String,
}

/// A stored message: one authored turn within a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Opaque identifier from the chat export; primary key
    pub id: String,
    /// Conversation this message belongs to
    pub conversation_id: String,
    /// Free-form author role ("user", "assistant", ...)
    pub author_role: String,
    /// Flattened markdown body
    pub content: String,
    /// String-encoded timestamp; epoch numeral or arbitrary string.
    /// The sort key for message display order.
    pub create_time: String,
}

/// Data for inserting or replacing a message
#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Export message identifier
    pub id: String,
    /// Conversation the message is filed under
    pub conversation_id: String,
    /// Author role, empty when the export omits it
    pub author_role: String,
    /// Flattened markdown body
    pub content: String,
    /// String-encoded creation timestamp
    pub create_time: String,
}

/// Outcome of reconciling a single chat-export document
#[derive(Debug, Clone)]
pub struct ImportReport {
    /// Conversation the messages were filed under
    pub conversation_id: String,
    /// Messages upserted
    pub imported: usize,
    /// Messages skipped because they could not be keyed or stored
    pub skipped: usize,
    /// True if the conversation row was created by this import
    pub created_conversation: bool,
}

/// Row counts for the whole store
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Number of conversation rows
    pub conversations: usize,
    /// Number of message rows
    pub messages: usize,
}
