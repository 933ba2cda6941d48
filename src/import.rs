//! Import reconciler
//!
//! Parses a chat-export JSON document and merges it into storage. A document
//! either appends to an existing conversation or creates a new one; messages
//! are keyed by their export id, so re-importing the same document is
//! idempotent. One malformed message never aborts the rest of an import.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{Result, SharedChatError};
use crate::models::{ImportReport, NewMessage};

/// Placeholder substituted for non-text content parts
pub const NON_TEXT_PLACEHOLDER: &str = "[Non-text content]";

/// How many id characters go into a synthesized conversation name
const NAME_ID_PREFIX_LEN: usize = 8;

/// Chat-export document as written by the exporting client
#[derive(Debug, Deserialize)]
struct ExportDocument {
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    messages: Vec<ExportMessage>,
}

#[derive(Debug, Deserialize)]
struct ExportMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    author: Option<ExportAuthor>,
    #[serde(default)]
    content: Option<ExportContent>,
    #[serde(default)]
    create_time: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ExportAuthor {
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExportContent {
    #[serde(default)]
    parts: Vec<Value>,
}

/// How an import run resolves conversation identity and naming
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Force-append into this conversation, overriding the document's own id
    pub target_conversation: Option<String>,
    /// Unattended mode: never ask for a name, derive it from the file name
    pub suppress_prompts: bool,
}

/// Interactive collaborator that can supply a name for a new conversation.
///
/// The UI shell implements this; `None` from the collaborator falls back to a
/// synthesized placeholder name.
pub trait ConversationNamer {
    /// Ask for a display name for the conversation being created
    fn request_name(&self, conversation_id: &str) -> Option<String>;
}

/// Import a single chat-export JSON file into storage.
///
/// Returns the resolved conversation id and message counts. Unreadable files
/// and invalid JSON fail with [`SharedChatError::Import`]; individual bad
/// messages are skipped and counted instead of failing the run.
pub fn import_file(
    db: &Database,
    path: &Path,
    options: &ImportOptions,
    namer: Option<&dyn ConversationNamer>,
) -> Result<ImportReport> {
    let raw = fs::read_to_string(path).map_err(|e| {
        SharedChatError::Import(format!("cannot read {}: {e}", path.display()))
    })?;
    let document: ExportDocument = serde_json::from_str(&raw).map_err(|e| {
        SharedChatError::Import(format!("invalid JSON in {}: {e}", path.display()))
    })?;

    // The explicitly supplied target wins over the document's own id
    let conversation_id = options
        .target_conversation
        .clone()
        .or(document.conversation_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            SharedChatError::Import(format!(
                "no conversation id in {} and none supplied",
                path.display()
            ))
        })?;

    let created_conversation = !db.conversation_exists(&conversation_id)?;
    if created_conversation {
        let name = resolve_name(&conversation_id, path, options, namer);
        db.upsert_conversation(&conversation_id, &name)?;
        debug!(conversation = %conversation_id, name = %name, "created conversation");
    }
    // An existing conversation keeps its name untouched: append mode.

    let mut imported = 0;
    let mut skipped = 0;
    for message in &document.messages {
        let Some(id) = message.id.as_deref().filter(|id| !id.is_empty()) else {
            warn!(file = %path.display(), "skipping message without id");
            skipped += 1;
            continue;
        };

        let new_message = NewMessage {
            id: id.to_string(),
            conversation_id: conversation_id.clone(),
            author_role: message
                .author
                .as_ref()
                .and_then(|a| a.role.clone())
                .unwrap_or_default(),
            content: message
                .content
                .as_ref()
                .map(|c| flatten_parts(&c.parts))
                .unwrap_or_default(),
            create_time: message
                .create_time
                .as_ref()
                .map(stringify_create_time)
                .unwrap_or_default(),
        };

        // Local recovery: a failed upsert skips one message, not the import
        match db.upsert_message(&new_message) {
            Ok(()) => imported += 1,
            Err(err) => {
                warn!(message = %id, error = %err, "failed to store message, skipping");
                skipped += 1;
            }
        }
    }

    Ok(ImportReport {
        conversation_id,
        imported,
        skipped,
        created_conversation,
    })
}

/// Pick a name for a conversation being created by this import
fn resolve_name(
    conversation_id: &str,
    path: &Path,
    options: &ImportOptions,
    namer: Option<&dyn ConversationNamer>,
) -> String {
    if options.suppress_prompts {
        // Unattended: the file's base name minus extension
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if !stem.is_empty() {
                return stem.to_string();
            }
        }
    } else if let Some(name) = namer.and_then(|n| n.request_name(conversation_id)) {
        if !name.is_empty() {
            return name;
        }
    }
    synthesized_name(conversation_id)
}

/// The placeholder name for an unnamed conversation
#[must_use]
pub fn synthesized_name(conversation_id: &str) -> String {
    let prefix: String = conversation_id.chars().take(NAME_ID_PREFIX_LEN).collect();
    format!("Conversation {prefix}")
}

/// Join content parts with newlines, replacing non-text parts with a marker
fn flatten_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .map(|part| match part {
            Value::String(text) => text.clone(),
            _ => NON_TEXT_PLACEHOLDER.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Store `create_time` as a string whatever the export encoded it as
fn stringify_create_time(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}
