//! AI title suggestion
//!
//! Finds conversations still carrying an auto-generated placeholder name and
//! asks an external collaborator for a short title based on the earliest
//! user-authored message. The pass runs as a background task with its own
//! pooled storage connections and reports progress incrementally over a
//! channel; the interactive side consumes events at its own cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::{Result, SharedChatError};
use crate::models::Conversation;

/// Names still matching this pattern are considered unnamed: either the
/// batch-import file-stem form (`messages-<uuid>...`) or the synthesized
/// `Conversation <id-prefix>` placeholder.
pub const DEFAULT_NAME_PATTERN: &str = r"^(messages-[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}|Conversation [0-9A-Za-z_-]{1,8}$)";

/// Longest excerpt of the first user message sent to the collaborator
pub const EXCERPT_CHAR_LIMIT: usize = 500;

static DEFAULT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(DEFAULT_NAME_PATTERN).expect("default name pattern is valid")
});

/// Whether a conversation name is still an auto-generated placeholder
#[must_use]
pub fn is_default_name(name: &str) -> bool {
    DEFAULT_NAME_RE.is_match(name)
}

/// External collaborator that proposes a short conversation title.
#[async_trait]
pub trait TitleSuggester: Send + Sync {
    /// Suggest a title for a conversation opened by `excerpt`
    async fn suggest_title(&self, excerpt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions title suggester.
pub struct HttpTitleSuggester {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl HttpTitleSuggester {
    /// Create a suggester against an OpenAI-compatible endpoint,
    /// e.g. `http://localhost:11434/v1` with model `llama3.2`.
    #[must_use]
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: String::new(),
        }
    }

    /// Attach a bearer token for endpoints that require one
    #[must_use]
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = api_key.to_string();
        self
    }
}

#[async_trait]
impl TitleSuggester for HttpTitleSuggester {
    async fn suggest_title(&self, excerpt: &str) -> Result<String> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are an assistant that names chat conversations.".to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Condense the conversation excerpt '{excerpt}' into a concise title \
                         of at most ten words. Output only the title, without explanation."
                    ),
                },
            ],
            temperature: 0.3,
            max_tokens: 20,
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SharedChatError::Collaborator(format!(
                "title request failed with status {}",
                response.status()
            )));
        }

        let data: ChatResponse = response.json().await?;
        data.choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|title| !title.is_empty())
            .ok_or_else(|| SharedChatError::Collaborator("empty title suggestion".to_string()))
    }
}

/// Progress events emitted by a rename pass, one per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameEvent {
    /// One conversation was renamed in storage
    Renamed {
        conversation_id: String,
        new_name: String,
    },
    /// One conversation was skipped after a collaborator or storage failure
    Failed {
        conversation_id: String,
        reason: String,
    },
    /// No conversation carries a placeholder name; the collaborator was not called
    NothingToRename,
    /// The pass could not run at all (e.g. storage unavailable)
    Aborted { reason: String },
    /// Terminal event with final counts
    Finished { renamed: usize, failed: usize },
}

/// Spawns title-suggestion passes, at most one at a time.
///
/// The busy flag plays the role of the disabled trigger control: while a
/// pass is in flight, further spawns are refused instead of overlapping.
#[derive(Clone, Default)]
pub struct RenameWorker {
    busy: Arc<AtomicBool>,
}

impl RenameWorker {
    /// Create an idle worker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a pass is currently in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Start a background rename pass.
    ///
    /// Returns the event stream for this pass, or
    /// [`SharedChatError::Collaborator`] if one is already running. The pass
    /// runs to completion whether or not the receiver keeps listening.
    pub fn spawn(
        &self,
        db: Database,
        suggester: Arc<dyn TitleSuggester>,
    ) -> Result<mpsc::Receiver<RenameEvent>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(SharedChatError::Collaborator(
                "a rename pass is already running".to_string(),
            ));
        }

        let busy = Arc::clone(&self.busy);
        let (events, receiver) = mpsc::channel(32);
        tokio::spawn(async move {
            if let Err(err) = run_rename_pass(&db, suggester.as_ref(), &events).await {
                warn!(error = %err, "rename pass aborted");
                let _ = events
                    .send(RenameEvent::Aborted {
                        reason: err.to_string(),
                    })
                    .await;
            }
            busy.store(false, Ordering::SeqCst);
        });
        Ok(receiver)
    }
}

/// One full pass over placeholder-named conversations.
async fn run_rename_pass(
    db: &Database,
    suggester: &dyn TitleSuggester,
    events: &mpsc::Sender<RenameEvent>,
) -> Result<()> {
    let list_db = db.clone();
    let mut unnamed: Vec<Conversation> =
        task::spawn_blocking(move || list_db.list_conversations(None))
            .await
            .map_err(|e| SharedChatError::Other(format!("rename task failed: {e}")))??
            .into_iter()
            .filter(|conversation| is_default_name(&conversation.name))
            .collect();
    // Newest imports first, mirroring the displayed list order
    unnamed.reverse();

    if unnamed.is_empty() {
        let _ = events.send(RenameEvent::NothingToRename).await;
        return Ok(());
    }

    let mut renamed = 0;
    let mut failed = 0;
    for conversation in unnamed {
        let fetch_db = db.clone();
        let fetch_id = conversation.id.clone();
        let first_message =
            task::spawn_blocking(move || fetch_db.first_user_message(&fetch_id))
                .await
                .map_err(|e| SharedChatError::Other(format!("rename task failed: {e}")))?;

        let content = match first_message {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!(conversation = %conversation.id, "no user message, skipping");
                continue;
            }
            Err(err) => {
                failed += 1;
                let _ = events
                    .send(RenameEvent::Failed {
                        conversation_id: conversation.id,
                        reason: err.to_string(),
                    })
                    .await;
                continue;
            }
        };

        let title = match suggester.suggest_title(excerpt(&content)).await {
            Ok(title) => title,
            Err(err) => {
                failed += 1;
                let _ = events
                    .send(RenameEvent::Failed {
                        conversation_id: conversation.id,
                        reason: err.to_string(),
                    })
                    .await;
                continue;
            }
        };

        let rename_db = db.clone();
        let rename_id = conversation.id.clone();
        let rename_title = title.clone();
        let stored =
            task::spawn_blocking(move || rename_db.rename_conversation(&rename_id, &rename_title))
                .await
                .map_err(|e| SharedChatError::Other(format!("rename task failed: {e}")))?;

        match stored {
            Ok(()) => {
                renamed += 1;
                // Emit immediately so the shell can reflect each rename as it lands
                let _ = events
                    .send(RenameEvent::Renamed {
                        conversation_id: conversation.id,
                        new_name: title,
                    })
                    .await;
            }
            Err(err) => {
                failed += 1;
                let _ = events
                    .send(RenameEvent::Failed {
                        conversation_id: conversation.id,
                        reason: err.to_string(),
                    })
                    .await;
            }
        }
    }

    let _ = events.send(RenameEvent::Finished { renamed, failed }).await;
    Ok(())
}

/// Bounded prefix of the first user message, on a char boundary
fn excerpt(text: &str) -> &str {
    match text.char_indices().nth(EXCERPT_CHAR_LIMIT) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_pattern_matches_placeholders() {
        assert!(is_default_name(
            "messages-0a1b2c3d-0011-2233-4455-66778899aabb"
        ));
        assert!(is_default_name(
            "messages-0a1b2c3d-0011-2233-4455-66778899aabb (1)"
        ));
        assert!(is_default_name("Conversation abcdef12"));
        assert!(is_default_name("Conversation abc"));
        assert!(!is_default_name("Planning the trip"));
        assert!(!is_default_name("Conversation about dogs"));
    }

    #[test]
    fn excerpt_is_char_bounded() {
        let long = "é".repeat(EXCERPT_CHAR_LIMIT + 10);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHAR_LIMIT);

        let short = "hello";
        assert_eq!(excerpt(short), "hello");
    }
}
