//! Batch and periodic import coordination
//!
//! Drives repeated imports over a download directory: a one-shot batch run
//! that archives successfully imported files, and a cooperative periodic
//! timer that re-runs the batch on a configurable interval. One file failing
//! never stops the rest of the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Result, SharedChatError};
use crate::import::{import_file, ImportOptions};
use crate::logging::OperationTimer;
use crate::titles::{RenameEvent, RenameWorker, TitleSuggester};

/// Name of the archive subfolder created beneath the import directory
pub const BACKUP_DIR_NAME: &str = "sharedchat_history_backup";

/// Outcome of one batch run over a directory
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    /// JSON files found and attempted
    pub processed: usize,
    /// Files imported successfully
    pub succeeded: usize,
    /// Files that failed to import (left in place)
    pub failed: usize,
    /// Successfully imported files moved into the backup folder
    pub archived: usize,
    /// Per-file failure causes
    pub failures: Vec<(PathBuf, String)>,
}

/// Import every JSON file directly inside `directory` (non-recursive).
///
/// Each file is imported in suppressed mode; only files that imported
/// successfully are moved into the backup subfolder, overwriting any
/// same-named file already archived there. Failed imports stay where they
/// are so nothing is silently lost. A failed move is logged and skipped.
pub fn run_batch_import(db: &Database, directory: &Path) -> Result<BatchReport> {
    if !directory.is_dir() {
        return Err(SharedChatError::Import(format!(
            "import directory does not exist: {}",
            directory.display()
        )));
    }

    let timer = OperationTimer::new("batch_import");
    let options = ImportOptions {
        target_conversation: None,
        suppress_prompts: true,
    };

    let mut files = json_files(directory)?;
    files.sort();

    let mut report = BatchReport::default();
    for file in files {
        report.processed += 1;
        match import_file(db, &file, &options, None) {
            Ok(outcome) => {
                info!(
                    file = %file.display(),
                    conversation = %outcome.conversation_id,
                    imported = outcome.imported,
                    "imported"
                );
                report.succeeded += 1;
                match move_to_backup(&file, directory) {
                    Ok(_) => report.archived += 1,
                    Err(err) => {
                        warn!(file = %file.display(), error = %err, "could not archive imported file");
                    }
                }
            }
            Err(err) => {
                warn!(file = %file.display(), error = %err, "import failed, file left in place");
                report.failed += 1;
                report.failures.push((file, err.to_string()));
            }
        }
    }

    timer.finish();
    Ok(report)
}

/// JSON files directly inside `directory`, non-recursive
fn json_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            files.push(path);
        }
    }
    Ok(files)
}

/// Move a processed file into the backup subfolder, overwriting any
/// same-named file already there.
fn move_to_backup(file: &Path, directory: &Path) -> Result<PathBuf> {
    let backup_dir = directory.join(BACKUP_DIR_NAME);
    fs::create_dir_all(&backup_dir)?;

    let file_name = file.file_name().ok_or_else(|| {
        SharedChatError::Import(format!("no file name in {}", file.display()))
    })?;
    let target = backup_dir.join(file_name);
    if target.exists() {
        fs::remove_file(&target)?;
    }
    fs::rename(file, &target)?;
    Ok(target)
}

/// Periodic batch importer.
///
/// Re-runs [`run_batch_import`] on a fixed interval as a cooperative tokio
/// task. Ticks use delay semantics, so a slow run postpones the next one —
/// runs never overlap. The task is cancellable and can be restarted with a
/// new interval.
pub struct AutoImporter {
    db: Database,
    directory: PathBuf,
    rename: Option<(RenameWorker, Arc<dyn TitleSuggester>)>,
    handle: Option<JoinHandle<()>>,
}

impl AutoImporter {
    /// Create an importer for the given store and download directory
    #[must_use]
    pub fn new(db: Database, directory: PathBuf) -> Self {
        Self {
            db,
            directory,
            rename: None,
            handle: None,
        }
    }

    /// Follow each batch run with a title-suggestion pass
    #[must_use]
    pub fn with_rename(mut self, worker: RenameWorker, suggester: Arc<dyn TitleSuggester>) -> Self {
        self.rename = Some((worker, suggester));
        self
    }

    /// Start (or restart) the periodic task with the given interval.
    ///
    /// Any pending timer is cancelled first, so changing the configured
    /// interval is a plain `start` with the new value.
    pub fn start(&mut self, interval_ms: u64) {
        self.stop();

        let db = self.db.clone();
        let directory = self.directory.clone();
        let rename = self.rename.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;

                let run_db = db.clone();
                let run_dir = directory.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || run_batch_import(&run_db, &run_dir)).await;
                match outcome {
                    Ok(Ok(report)) => {
                        info!(
                            processed = report.processed,
                            succeeded = report.succeeded,
                            failed = report.failed,
                            "periodic import finished"
                        );
                        if let Some((worker, suggester)) = rename.as_ref() {
                            run_rename_pass(&db, worker, suggester).await;
                        }
                    }
                    Ok(Err(err)) => warn!(error = %err, "periodic import failed"),
                    Err(err) => warn!(error = %err, "periodic import task panicked"),
                }
            }
        });
        self.handle = Some(handle);
    }

    /// Restart with a new interval
    pub fn restart(&mut self, interval_ms: u64) {
        self.start(interval_ms);
    }

    /// Cancel the pending timer, if any
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether the periodic task is currently scheduled
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for AutoImporter {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run one title-suggestion pass and log its events.
async fn run_rename_pass(db: &Database, worker: &RenameWorker, suggester: &Arc<dyn TitleSuggester>) {
    match worker.spawn(db.clone(), Arc::clone(suggester)) {
        Ok(mut events) => {
            while let Some(event) = events.recv().await {
                match event {
                    RenameEvent::Renamed {
                        conversation_id,
                        new_name,
                    } => info!(conversation = %conversation_id, name = %new_name, "conversation renamed"),
                    RenameEvent::Failed {
                        conversation_id,
                        reason,
                    } => warn!(conversation = %conversation_id, reason = %reason, "rename skipped"),
                    RenameEvent::NothingToRename => debug!("no conversations need renaming"),
                    RenameEvent::Aborted { reason } => warn!(reason = %reason, "rename pass aborted"),
                    RenameEvent::Finished { renamed, failed } => {
                        info!(renamed, failed, "rename pass finished");
                    }
                }
            }
        }
        // A pass is already in flight; skip this cycle rather than overlap
        Err(err) => debug!(error = %err, "rename pass not started"),
    }
}
