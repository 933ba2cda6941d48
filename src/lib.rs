//! SharedChat - Chat Archive Management and Rendering
//!
//! A Rust library for importing exported chat-log JSON files into a local
//! SQLite store, browsing conversations, and rendering messages as paginated
//! themed HTML.
//!
//! # Features
//!
//! - Idempotent JSON import with append-or-create conversation merging
//! - Deterministic message pagination with an accumulating HTML transcript
//! - Batch directory imports with archive-on-success
//! - Background AI title suggestion for unnamed conversations

/// Batch and periodic import coordination
pub mod batch;
/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Transcript export helpers
pub mod export;
/// Import reconciliation of chat-export documents
pub mod import;
/// Logging setup and utilities
pub mod logging;
/// Data models and structures
pub mod models;
/// Pagination and HTML rendering
pub mod render;
/// Database schema definitions
pub mod schema;
/// AI title suggestion
pub mod titles;

// Re-export key components for easier access
pub use config::AppConfig;
pub use db::Database;
pub use error::{Result, SharedChatError};
pub use models::{Conversation, ImportReport, NewMessage, StoredMessage};
pub use render::TranscriptView;
