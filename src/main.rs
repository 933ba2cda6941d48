use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use sharedchat::batch::{run_batch_import, AutoImporter};
use sharedchat::config::AppConfig;
use sharedchat::db::Database;
use sharedchat::export::{chunk_text, save_html, transcript_text, CLIPBOARD_CHUNK_CHARS};
use sharedchat::import::{import_file, ConversationNamer, ImportOptions};
use sharedchat::logging::init_logging;
use sharedchat::render::{TranscriptView, MESSAGES_PER_PAGE};
use sharedchat::titles::{HttpTitleSuggester, RenameEvent, RenameWorker};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, default_value = "conversations.db", global = true)]
    database: String,

    /// Path to the config file (defaults to ~/.sharedchat_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a single chat-export JSON file
    Import {
        /// Path to the JSON file
        file: PathBuf,

        /// Append into this existing conversation instead of the document's own
        #[arg(short, long)]
        conversation: Option<String>,

        /// Display name to use if a new conversation is created
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Import every JSON file in a directory, archiving successes
    Batch {
        /// Directory to scan (defaults to the configured download directory)
        directory: Option<PathBuf>,
    },
    /// Run the periodic importer until interrupted
    Watch {
        /// Title-suggestion endpoint (OpenAI-compatible)
        #[arg(long, default_value = "http://localhost:11434/v1")]
        base_url: String,

        /// Title-suggestion model
        #[arg(long, default_value = "llama3.2")]
        model: String,
    },
    /// List conversations, newest import first
    List {
        /// Only show names containing this substring (case-sensitive)
        filter: Option<String>,
    },
    /// Render pages of a conversation as themed HTML
    Render {
        /// Conversation id
        conversation: String,

        /// Number of pages to accumulate, from the start
        #[arg(short, long, default_value = "1")]
        pages: usize,

        /// Use the dark palette
        #[arg(long)]
        dark: bool,

        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Export the full conversation transcript as an HTML file
    Export {
        /// Conversation id
        conversation: String,

        /// Output file path
        output: PathBuf,

        /// Use the dark palette
        #[arg(long)]
        dark: bool,
    },
    /// Print the plain-text transcript in clipboard-sized chunks
    Copy {
        /// Conversation id
        conversation: String,
    },
    /// Delete a conversation and all of its messages
    Delete {
        /// Conversation id
        conversation: String,
    },
    /// Rename a conversation
    Rename {
        /// Conversation id
        conversation: String,

        /// New display name
        name: String,
    },
    /// Ask the AI collaborator to title placeholder-named conversations
    SuggestTitles {
        /// Title-suggestion endpoint (OpenAI-compatible)
        #[arg(long, default_value = "http://localhost:11434/v1")]
        base_url: String,

        /// Title-suggestion model
        #[arg(long, default_value = "llama3.2")]
        model: String,

        /// Bearer token, if the endpoint needs one
        #[arg(long, default_value = "")]
        api_key: String,
    },
    /// Show row counts for the store
    Stats,
}

/// The CLI stands in for the interactive name prompt: a `--name` flag is the
/// answered dialog, its absence is a dismissed one.
struct CliNamer {
    name: Option<String>,
}

impl ConversationNamer for CliNamer {
    fn request_name(&self, _conversation_id: &str) -> Option<String> {
        self.name.clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(Some("info"), None)?;

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    // Storage unavailability at startup is the one unrecoverable condition
    let db = Database::new(&cli.database)
        .with_context(|| format!("cannot open database at {}", cli.database))?;

    match cli.command {
        Commands::Import {
            file,
            conversation,
            name,
        } => import_cmd(&db, &file, conversation, name),
        Commands::Batch { directory } => batch_cmd(&db, &config, directory),
        Commands::Watch { base_url, model } => watch_cmd(db, &config, &base_url, &model).await,
        Commands::List { filter } => list_cmd(&db, filter.as_deref()),
        Commands::Render {
            conversation,
            pages,
            dark,
            output,
        } => render_cmd(&db, &conversation, pages, dark, output.as_deref()),
        Commands::Export {
            conversation,
            output,
            dark,
        } => export_cmd(&db, &conversation, &output, dark),
        Commands::Copy { conversation } => copy_cmd(&db, &conversation),
        Commands::Delete { conversation } => delete_cmd(&db, &conversation),
        Commands::Rename { conversation, name } => rename_cmd(&db, &conversation, &name),
        Commands::SuggestTitles {
            base_url,
            model,
            api_key,
        } => suggest_titles_cmd(db, &base_url, &model, &api_key).await,
        Commands::Stats => stats_cmd(&db),
    }
}

/// Import a single file, optionally appending into an existing conversation
fn import_cmd(
    db: &Database,
    file: &std::path::Path,
    conversation: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let options = ImportOptions {
        target_conversation: conversation,
        suppress_prompts: false,
    };
    let namer = CliNamer { name };
    let report = import_file(db, file, &options, Some(&namer))?;

    if report.created_conversation {
        println!(
            "Created conversation {} with {} message(s)",
            report.conversation_id, report.imported
        );
    } else {
        println!(
            "Appended {} message(s) to conversation {}",
            report.imported, report.conversation_id
        );
    }
    if report.skipped > 0 {
        println!("Skipped {} malformed message(s)", report.skipped);
    }
    Ok(())
}

/// Import every JSON file in a directory
fn batch_cmd(db: &Database, config: &AppConfig, directory: Option<PathBuf>) -> Result<()> {
    let directory = directory
        .or_else(|| config.import_directory())
        .context("no directory given and no download directory configured")?;

    let report = run_batch_import(db, &directory)?;
    println!(
        "Processed {} file(s): {} imported, {} failed, {} archived",
        report.processed, report.succeeded, report.failed, report.archived
    );
    for (file, reason) in &report.failures {
        println!("  failed: {} ({reason})", file.display());
    }
    Ok(())
}

/// Run the periodic importer until ctrl-c
async fn watch_cmd(db: Database, config: &AppConfig, base_url: &str, model: &str) -> Result<()> {
    let directory = config
        .import_directory()
        .context("configure a download directory before watching")?;
    if !config.auto_import {
        warn!("auto_import is disabled in the config; watching anyway");
    }

    let mut importer = AutoImporter::new(db, directory);
    if config.enable_ai_rename {
        let suggester = Arc::new(HttpTitleSuggester::new(base_url, model));
        importer = importer.with_rename(RenameWorker::new(), suggester);
    }
    importer.start(config.auto_import_interval);
    info!(
        interval_ms = config.auto_import_interval,
        "periodic import running, press ctrl-c to stop"
    );

    tokio::signal::ctrl_c().await?;
    importer.stop();
    Ok(())
}

/// List conversations; display order is the reverse of storage order
fn list_cmd(db: &Database, filter: Option<&str>) -> Result<()> {
    let mut conversations = db.list_conversations(filter)?;
    conversations.reverse();

    if conversations.is_empty() {
        println!("No conversations");
        return Ok(());
    }
    for conversation in conversations {
        println!("{} ({})", conversation.name, conversation.id);
    }
    Ok(())
}

/// Render the first `pages` pages of a conversation
fn render_cmd(
    db: &Database,
    conversation: &str,
    pages: usize,
    dark: bool,
    output: Option<&std::path::Path>,
) -> Result<()> {
    let mut view = TranscriptView::new();
    if dark {
        let _ = view.toggle_theme();
    }

    let mut document = view.render_page(db, conversation, 0)?;
    for page in 1..pages {
        document = view.render_page(db, conversation, page)?;
    }

    match output {
        Some(path) => {
            save_html(&document, path)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}

/// Export the complete transcript as a self-contained HTML document
fn export_cmd(
    db: &Database,
    conversation: &str,
    output: &std::path::Path,
    dark: bool,
) -> Result<()> {
    let total = db.count_messages(conversation)?;
    let pages = total.div_ceil(MESSAGES_PER_PAGE).max(1);

    let mut view = TranscriptView::new();
    if dark {
        let _ = view.toggle_theme();
    }
    let mut document = view.render_page(db, conversation, 0)?;
    for page in 1..pages {
        document = view.render_page(db, conversation, page)?;
    }

    save_html(&document, output)?;
    println!("Exported {total} message(s) to {}", output.display());
    Ok(())
}

/// Print the plain-text transcript in clipboard-sized chunks
fn copy_cmd(db: &Database, conversation: &str) -> Result<()> {
    let text = transcript_text(db, conversation)?;
    let chunks = chunk_text(&text, CLIPBOARD_CHUNK_CHARS);
    match chunks.len() {
        0 => println!("Conversation is empty"),
        1 => println!("{}", chunks[0]),
        total => {
            for (index, chunk) in chunks.iter().enumerate() {
                println!("--- chunk {} of {total} ---", index + 1);
                println!("{chunk}");
            }
        }
    }
    Ok(())
}

/// Delete a conversation and its messages
fn delete_cmd(db: &Database, conversation: &str) -> Result<()> {
    db.delete_conversation(conversation)?;
    println!("Deleted conversation {conversation}");
    Ok(())
}

/// Rename a conversation
fn rename_cmd(db: &Database, conversation: &str, name: &str) -> Result<()> {
    anyhow::ensure!(!name.trim().is_empty(), "name cannot be empty");
    db.rename_conversation(conversation, name)?;
    println!("Renamed conversation {conversation} to {name}");
    Ok(())
}

/// Run one title-suggestion pass, reporting each rename as it lands
async fn suggest_titles_cmd(db: Database, base_url: &str, model: &str, api_key: &str) -> Result<()> {
    let suggester = Arc::new(HttpTitleSuggester::new(base_url, model).with_api_key(api_key));
    let worker = RenameWorker::new();
    let mut events = worker.spawn(db, suggester)?;

    while let Some(event) = events.recv().await {
        match event {
            RenameEvent::Renamed {
                conversation_id,
                new_name,
            } => println!("Renamed {conversation_id} to \"{new_name}\""),
            RenameEvent::Failed {
                conversation_id,
                reason,
            } => println!("Skipped {conversation_id}: {reason}"),
            RenameEvent::NothingToRename => println!("No conversations need renaming"),
            RenameEvent::Aborted { reason } => println!("Rename pass aborted: {reason}"),
            RenameEvent::Finished { renamed, failed } => {
                println!("Done: {renamed} renamed, {failed} failed");
            }
        }
    }
    Ok(())
}

/// Show row counts
fn stats_cmd(db: &Database) -> Result<()> {
    let stats = db.stats()?;
    println!(
        "{} conversation(s), {} message(s)",
        stats.conversations, stats.messages
    );
    Ok(())
}
