use std::fs;

use tempfile::{tempdir, TempDir};

use sharedchat::db::Database;
use sharedchat::export::{chunk_text, save_html, transcript_text, CLIPBOARD_CHUNK_CHARS};
use sharedchat::models::NewMessage;
use sharedchat::render::TranscriptView;

fn open_db(dir: &TempDir) -> Database {
    let db_path = dir.path().join("test.db");
    Database::new(&db_path.to_string_lossy()).expect("Failed to create database")
}

#[test]
fn test_saved_html_is_verbatim() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);

    db.upsert_conversation("c1", "Chat").expect("Failed to upsert");
    db.upsert_message(&NewMessage {
        id: "m1".to_string(),
        conversation_id: "c1".to_string(),
        author_role: "user".to_string(),
        content: "exported content — with unicode ✓".to_string(),
        create_time: "1700000000".to_string(),
    })
    .expect("Failed to upsert message");

    let mut view = TranscriptView::new();
    let document = view.render_page(&db, "c1", 0).expect("Render failed");

    let out_path = dir.path().join("transcript.html");
    save_html(&document, &out_path).expect("Failed to save HTML");

    let written = fs::read_to_string(&out_path).expect("Failed to read back");
    assert_eq!(written, document);
    assert!(written.contains("exported content"));
}

#[test]
fn test_transcript_text_lines_up_roles_and_content() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);

    db.upsert_conversation("c1", "Chat").expect("Failed to upsert");
    for (id, role, content, time) in [
        ("m1", "user", "first question", "100"),
        ("m2", "assistant", "first answer", "200"),
        ("m3", "user", "second question", "300"),
    ] {
        db.upsert_message(&NewMessage {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            author_role: role.to_string(),
            content: content.to_string(),
            create_time: time.to_string(),
        })
        .expect("Failed to upsert message");
    }

    let text = transcript_text(&db, "c1").expect("Failed to build transcript");
    assert_eq!(
        text,
        "user: first question\nassistant: first answer\nuser: second question\n"
    );
}

#[test]
fn test_long_transcripts_chunk_within_budget() {
    let text = "x".repeat(CLIPBOARD_CHUNK_CHARS * 2 + 17);
    let chunks = chunk_text(&text, CLIPBOARD_CHUNK_CHARS);

    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().count() <= CLIPBOARD_CHUNK_CHARS));
    assert_eq!(chunks.concat(), text);
}
