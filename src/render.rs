//! Pagination and HTML rendering
//!
//! Turns a window of stored messages into a themed HTML document. Rendered
//! fragments accumulate in a [`TranscriptView`] as the user pages forward;
//! switching theme re-wraps the accumulated buffer without touching storage.

use chrono::DateTime;
use pulldown_cmark::{escape::escape_html, html, Options, Parser};

use crate::db::Database;
use crate::error::Result;
use crate::models::StoredMessage;

/// Messages fetched per page request
pub const MESSAGES_PER_PAGE: usize = 10;

/// Colors for the outer document template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Page background color
    pub background: &'static str,
    /// Body text color
    pub text: &'static str,
    /// Per-message separator color
    pub border: &'static str,
}

/// Light palette
pub const LIGHT_THEME: Theme = Theme {
    background: "#fff",
    text: "#000",
    border: "#ccc",
};

/// Dark palette
pub const DARK_THEME: Theme = Theme {
    background: "#333",
    text: "#fff",
    border: "#555",
};

/// Session state for the conversation currently on screen.
///
/// Owns the accumulating HTML buffer, the page cursor and the theme flag so
/// none of that lives in free-floating globals.
#[derive(Debug, Default)]
pub struct TranscriptView {
    conversation_id: Option<String>,
    page: usize,
    buffer: String,
    dark_mode: bool,
    messages_per_page: usize,
}

impl TranscriptView {
    /// Create a view with the default page size
    #[must_use]
    pub fn new() -> Self {
        Self::with_page_size(MESSAGES_PER_PAGE)
    }

    /// Create a view fetching `messages_per_page` messages per request
    #[must_use]
    pub fn with_page_size(messages_per_page: usize) -> Self {
        Self {
            conversation_id: None,
            page: 0,
            buffer: String::new(),
            dark_mode: false,
            messages_per_page: messages_per_page.max(1),
        }
    }

    /// Conversation currently shown, if any
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Current page index
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
    }

    /// Whether the dark palette is active
    #[must_use]
    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Render one page of a conversation and return the full document.
    ///
    /// Page 0 (or a different conversation than the one on screen) replaces
    /// the accumulated buffer; any later page appends to it, growing the
    /// transcript monotonically. Paging is forward-only.
    pub fn render_page(
        &mut self,
        db: &Database,
        conversation_id: &str,
        page_index: usize,
    ) -> Result<String> {
        let offset = page_index * self.messages_per_page;
        let messages = db.list_messages_page(conversation_id, self.messages_per_page, offset)?;

        let mut fragment = String::new();
        for message in &messages {
            fragment.push_str(&render_message(message));
        }

        let switched = self.conversation_id.as_deref() != Some(conversation_id);
        if page_index == 0 || switched {
            self.buffer = fragment;
        } else {
            self.buffer.push_str(&fragment);
        }
        self.conversation_id = Some(conversation_id.to_string());
        self.page = page_index;

        Ok(self.document())
    }

    /// Select a conversation, resetting to its first page
    pub fn select(&mut self, db: &Database, conversation_id: &str) -> Result<String> {
        self.render_page(db, conversation_id, 0)
    }

    /// Advance to the next page of the current conversation.
    ///
    /// Returns `None` when no conversation is selected.
    pub fn next_page(&mut self, db: &Database) -> Result<Option<String>> {
        let Some(conversation_id) = self.conversation_id.clone() else {
            return Ok(None);
        };
        let page = self.page + 1;
        self.render_page(db, &conversation_id, page).map(Some)
    }

    /// Flip between the light and dark palette and re-render.
    ///
    /// Only re-wraps the already-accumulated buffer; storage is not queried.
    pub fn toggle_theme(&mut self) -> String {
        self.dark_mode = !self.dark_mode;
        self.document()
    }

    /// The complete HTML document for the current buffer and theme
    #[must_use]
    pub fn document(&self) -> String {
        let theme = if self.dark_mode { DARK_THEME } else { LIGHT_THEME };
        wrap_document(&self.buffer, theme)
    }
}

/// Render a single message through the fixed per-message template
fn render_message(message: &StoredMessage) -> String {
    let author = escape(&message.author_role);
    let timestamp = escape(&format_timestamp(&message.create_time));
    let body = markdown_to_html(&message.content);
    format!(
        r#"
<div class="message">
    <div class="author">{author}</div>
    <div class="timestamp">{timestamp}</div>
    <div class="content">{body}</div>
</div>
"#
    )
}

/// Format a string-encoded timestamp for display.
///
/// Interprets the stored value as a floating-point Unix epoch and formats it
/// as `YYYY-MM-DD HH:MM:SS` (UTC). Anything that does not parse is shown
/// verbatim; this never fails.
#[must_use]
pub fn format_timestamp(raw: &str) -> String {
    let Ok(epoch) = raw.trim().parse::<f64>() else {
        return raw.to_string();
    };
    if !epoch.is_finite() {
        return raw.to_string();
    }
    let secs = epoch.floor();
    let nanos = ((epoch - secs) * 1_000_000_000.0) as u32;
    match DateTime::from_timestamp(secs as i64, nanos) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => raw.to_string(),
    }
}

/// Convert markdown message content to HTML
#[must_use]
pub fn markdown_to_html(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(content, options);
    let mut out = String::with_capacity(content.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Wrap accumulated message fragments in the outer document template
#[must_use]
pub fn wrap_document(body: &str, theme: Theme) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Conversation Messages</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            padding: 20px;
            background-color: {background};
            color: {text};
        }}
        .message {{
            margin-bottom: 20px;
            padding: 10px;
            border-bottom: 1px solid {border};
        }}
        .author {{
            font-weight: bold;
        }}
        .timestamp {{
            color: {text};
            font-size: 0.9em;
        }}
        pre {{
            white-space: pre-wrap;
        }}
    </style>
</head>
<body>{body}</body>
</html>
"#,
        background = theme.background,
        text = theme.text,
        border = theme.border,
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let _ = escape_html(&mut out, text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_timestamps_format_in_utc() {
        assert_eq!(format_timestamp("1700000000"), "2023-11-14 22:13:20");
        assert_eq!(format_timestamp("0"), "1970-01-01 00:00:00");
    }

    #[test]
    fn unparseable_timestamps_pass_through() {
        assert_eq!(format_timestamp("yesterday"), "yesterday");
        assert_eq!(format_timestamp(""), "");
        assert_eq!(format_timestamp("NaN"), "NaN");
    }

    #[test]
    fn markdown_renders_basic_html() {
        let html = markdown_to_html("**bold** text");
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn author_markup_is_escaped() {
        let message = StoredMessage {
            id: "m1".into(),
            conversation_id: "c1".into(),
            author_role: "<script>".into(),
            content: "hi".into(),
            create_time: String::new(),
        };
        let rendered = render_message(&message);
        assert!(rendered.contains("&lt;script&gt;"));
    }
}
