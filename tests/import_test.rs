use std::fs;
use std::path::PathBuf;

use tempfile::{tempdir, TempDir};

use sharedchat::db::Database;
use sharedchat::import::{import_file, ConversationNamer, ImportOptions, NON_TEXT_PLACEHOLDER};
use sharedchat::render::format_timestamp;
use sharedchat::SharedChatError;

fn open_db(dir: &TempDir) -> Database {
    let db_path = dir.path().join("test.db");
    Database::new(&db_path.to_string_lossy()).expect("Failed to create database")
}

fn write_export(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("Failed to write export file");
    path
}

struct FixedNamer(Option<String>);

impl ConversationNamer for FixedNamer {
    fn request_name(&self, _conversation_id: &str) -> Option<String> {
        self.0.clone()
    }
}

const SCENARIO: &str = r#"{"conversation_id":"abc123","messages":[{"id":"m1","author":{"role":"user"},"content":{"parts":["hello"]},"create_time":"1700000000"}]}"#;

#[test]
fn test_import_scenario_document() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let file = write_export(&dir, "export.json", SCENARIO);

    let report = import_file(&db, &file, &ImportOptions::default(), None)
        .expect("Import failed");

    assert_eq!(report.conversation_id, "abc123");
    assert_eq!(report.imported, 1);
    assert!(report.created_conversation);

    let messages = db.list_messages_page("abc123", 10, 0).expect("Failed to page");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "hello");
    assert_eq!(messages[0].author_role, "user");
    assert_eq!(format_timestamp(&messages[0].create_time), "2023-11-14 22:13:20");
}

#[test]
fn test_reimport_produces_no_duplicates() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let file = write_export(&dir, "export.json", SCENARIO);

    import_file(&db, &file, &ImportOptions::default(), None).expect("First import failed");
    let before = db.stats().expect("Failed to read stats");

    import_file(&db, &file, &ImportOptions::default(), None).expect("Second import failed");
    let after = db.stats().expect("Failed to read stats");

    assert_eq!(before.conversations, after.conversations);
    assert_eq!(before.messages, after.messages);
}

#[test]
fn test_append_mode_keeps_existing_name() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    db.upsert_conversation("abc123", "My chosen name").expect("Failed to upsert");

    let file = write_export(&dir, "export.json", SCENARIO);
    let namer = FixedNamer(Some("Should be ignored".to_string()));
    let report = import_file(&db, &file, &ImportOptions::default(), Some(&namer))
        .expect("Import failed");

    assert!(!report.created_conversation);
    let conversation = db
        .get_conversation("abc123")
        .expect("Failed to query")
        .expect("Missing conversation");
    assert_eq!(conversation.name, "My chosen name");
}

#[test]
fn test_target_conversation_overrides_document_id() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    db.upsert_conversation("target", "Target chat").expect("Failed to upsert");

    let file = write_export(&dir, "export.json", SCENARIO);
    let options = ImportOptions {
        target_conversation: Some("target".to_string()),
        suppress_prompts: false,
    };
    let report = import_file(&db, &file, &options, None).expect("Import failed");

    assert_eq!(report.conversation_id, "target");
    assert_eq!(db.count_messages("target").expect("Failed to count"), 1);
    assert_eq!(db.count_messages("abc123").expect("Failed to count"), 0);
}

#[test]
fn test_missing_conversation_id_is_an_import_error() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let file = write_export(&dir, "export.json", r#"{"messages":[]}"#);

    let err = import_file(&db, &file, &ImportOptions::default(), None)
        .expect_err("Import should fail");
    assert!(matches!(err, SharedChatError::Import(_)));
}

#[test]
fn test_invalid_json_is_an_import_error() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let file = write_export(&dir, "export.json", "{not json");

    let err = import_file(&db, &file, &ImportOptions::default(), None)
        .expect_err("Import should fail");
    assert!(matches!(err, SharedChatError::Import(_)));
}

#[test]
fn test_suppressed_import_names_from_file_stem() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let file = write_export(&dir, "messages-20250102.json", SCENARIO);

    let options = ImportOptions {
        target_conversation: None,
        suppress_prompts: true,
    };
    import_file(&db, &file, &options, None).expect("Import failed");

    let conversation = db
        .get_conversation("abc123")
        .expect("Failed to query")
        .expect("Missing conversation");
    assert_eq!(conversation.name, "messages-20250102");
}

#[test]
fn test_unanswered_prompt_synthesizes_placeholder_name() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let file = write_export(&dir, "export.json", SCENARIO);

    let namer = FixedNamer(None);
    import_file(&db, &file, &ImportOptions::default(), Some(&namer)).expect("Import failed");

    let conversation = db
        .get_conversation("abc123")
        .expect("Failed to query")
        .expect("Missing conversation");
    assert_eq!(conversation.name, "Conversation abc123");
}

#[test]
fn test_non_text_parts_become_placeholder() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let body = r#"{"conversation_id":"c1","messages":[
        {"id":"m1","author":{"role":"user"},
         "content":{"parts":["look at this", {"asset_pointer":"file://x"}, "done"]},
         "create_time":"1"}]}"#;
    let file = write_export(&dir, "export.json", body);

    import_file(&db, &file, &ImportOptions::default(), None).expect("Import failed");

    let messages = db.list_messages_page("c1", 10, 0).expect("Failed to page");
    assert_eq!(
        messages[0].content,
        format!("look at this\n{NON_TEXT_PLACEHOLDER}\ndone")
    );
}

#[test]
fn test_malformed_message_does_not_abort_import() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    // Second message has no id; first and third are fine
    let body = r#"{"conversation_id":"c1","messages":[
        {"id":"m1","author":{"role":"user"},"content":{"parts":["one"]},"create_time":"1"},
        {"author":{"role":"user"},"content":{"parts":["lost"]},"create_time":"2"},
        {"id":"m3","author":{"role":"assistant"},"content":{"parts":["three"]},"create_time":"3"}]}"#;
    let file = write_export(&dir, "export.json", body);

    let report = import_file(&db, &file, &ImportOptions::default(), None).expect("Import failed");

    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(db.count_messages("c1").expect("Failed to count"), 2);
}

#[test]
fn test_missing_fields_default_to_empty() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let body = r#"{"conversation_id":"c1","messages":[{"id":"m1"}]}"#;
    let file = write_export(&dir, "export.json", body);

    import_file(&db, &file, &ImportOptions::default(), None).expect("Import failed");

    let messages = db.list_messages_page("c1", 10, 0).expect("Failed to page");
    assert_eq!(messages[0].author_role, "");
    assert_eq!(messages[0].content, "");
    assert_eq!(messages[0].create_time, "");
}

#[test]
fn test_numeric_create_time_is_stringified() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let body = r#"{"conversation_id":"c1","messages":[
        {"id":"m1","author":{"role":"user"},"content":{"parts":["hi"]},"create_time":1700000000.5}]}"#;
    let file = write_export(&dir, "export.json", body);

    import_file(&db, &file, &ImportOptions::default(), None).expect("Import failed");

    let messages = db.list_messages_page("c1", 10, 0).expect("Failed to page");
    assert_eq!(messages[0].create_time, "1700000000.5");
}

#[test]
fn test_non_numeric_create_time_renders_verbatim() {
    let dir = tempdir().expect("Failed to create temp directory");
    let db = open_db(&dir);
    let body = r#"{"conversation_id":"c1","messages":[
        {"id":"m1","author":{"role":"user"},"content":{"parts":["hi"]},"create_time":"around noon"}]}"#;
    let file = write_export(&dir, "export.json", body);

    import_file(&db, &file, &ImportOptions::default(), None).expect("Import failed");

    let messages = db.list_messages_page("c1", 10, 0).expect("Failed to page");
    assert_eq!(format_timestamp(&messages[0].create_time), "around noon");
}
