//! Transcript export helpers
//!
//! Writes rendered HTML documents verbatim and builds the plain-text
//! transcript used by the shell's chunked clipboard flow.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::db::Database;
use crate::error::Result;

/// Character budget per clipboard chunk
pub const CLIPBOARD_CHUNK_CHARS: usize = 8_000;

/// Write a rendered HTML document to `path`, UTF-8, verbatim.
pub fn save_html(html: &str, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(html.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Build the plain-text transcript of a conversation: one `role: content`
/// line per message, in storage order.
pub fn transcript_text(db: &Database, conversation_id: &str) -> Result<String> {
    let messages = db.transcript(conversation_id)?;
    let mut text = String::new();
    for message in &messages {
        text.push_str(&message.author_role);
        text.push_str(": ");
        text.push_str(&message.content);
        text.push('\n');
    }
    Ok(text)
}

/// Split text into chunks of at most `limit` characters, on char boundaries.
#[must_use]
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() || limit == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_respect_char_boundaries() {
        let text = "ab".repeat(5);
        let chunks = chunk_text(&text, 3);
        assert_eq!(chunks, vec!["aba", "bab", "aba", "b"]);

        // Multi-byte characters must not be split mid-codepoint
        let chunks = chunk_text("日本語テキスト", 2);
        assert_eq!(chunks, vec!["日本", "語テ", "キス", "ト"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", CLIPBOARD_CHUNK_CHARS).is_empty());
    }
}
