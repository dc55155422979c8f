use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::batch::Batch;
use crate::classify::FileFilter;
use crate::dispatch::{Dispatcher, Subject};
use crate::error::Error;
use crate::platform;
use crate::progress::ProgressReporter;

/// Asks the operator a yes/no question.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> io::Result<bool>;
}

#[derive(Debug, Clone)]
pub struct WalkPolicy {
    pub label: String,
    pub filter: FileFilter,
    /// Files per directory level above which the operator must confirm.
    pub threshold: usize,
    pub ignore_count_limit: bool,
    pub ignore_patterns: Vec<Pattern>,
}

pub struct DirectoryWalker<'a> {
    policy: WalkPolicy,
    confirm: &'a dyn Confirm,
    reporter: &'a dyn ProgressReporter,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(
        policy: WalkPolicy,
        confirm: &'a dyn Confirm,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            policy,
            confirm,
            reporter,
        }
    }

    /// Walk `root` depth-first, one directory level at a time, submitting every accepted file.
    ///
    /// Returns early with the dispatcher's error on a fatal outcome, and with
    /// [`Error::Aborted`] when the operator declines a large directory.
    pub fn walk(&self, root: &Path, dispatcher: &Dispatcher<'_>) -> Result<Batch, Error> {
        let mut batch = Batch::new();
        if let Err(err) = self.visit_dir(root, dispatcher, &mut batch) {
            info!(
                "Walk of {} stopped after {} succeeded, {} failed, {} unsupported",
                root.display(),
                batch.result.success_count,
                batch.result.failed_count,
                batch.result.unsupported_count
            );
            return Err(err);
        }
        Ok(batch)
    }

    fn visit_dir(
        &self,
        dir: &Path,
        dispatcher: &Dispatcher<'_>,
        batch: &mut Batch,
    ) -> Result<(), Error> {
        let (files, dirs) = self.list_dir(dir)?;
        debug!(
            "{}: {} files, {} subdirectories",
            dir.display(),
            files.len(),
            dirs.len()
        );

        if !self.policy.ignore_count_limit {
            check_should_continue_for_large_dir(files.len(), self.policy.threshold, self.confirm)?;
        }

        if !files.is_empty() {
            self.reporter.on_batch_start(&self.policy.label, files.len());
            let outcome = self.process_files(&files, dispatcher, batch);
            self.reporter.on_batch_complete();
            outcome?;
        }

        for sub_dir in dirs {
            self.visit_dir(&sub_dir, dispatcher, batch)?;
        }

        Ok(())
    }

    fn process_files(
        &self,
        files: &[PathBuf],
        dispatcher: &Dispatcher<'_>,
        batch: &mut Batch,
    ) -> Result<(), Error> {
        for file in files {
            let subject = file.display().to_string();
            let recorded = if self.policy.filter.accepts(file) {
                batch.record(subject, dispatcher.submit(Subject::File(file)))
            } else {
                debug!("Skipping unsupported file {}", file.display());
                batch.unsupported();
                Ok(())
            };
            self.reporter.on_item_done();

            // No further submissions once the account is out of quota.
            if let Err(failure) = recorded {
                return Err(Error::Api(failure.error));
            }
        }
        Ok(())
    }

    /// Visible files and subdirectories of one level, in file-name order.
    fn list_dir(&self, dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), Error> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();

        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err.io_error().map(|e| e.kind()) == Some(io::ErrorKind::PermissionDenied) {
                        error!("Access denied reading directory {}: {}", dir.display(), err);
                        continue;
                    }
                    return Err(Error::Io(err.into()));
                }
            };

            let path = entry.path();
            if platform::is_hidden(path) || self.is_ignored(path) {
                continue;
            }

            if entry.path_is_symlink() {
                // Linked directories are never descended into. A broken link is
                // still a visible file and ends up counted as unsupported.
                match fs::metadata(path) {
                    Ok(target) if target.is_dir() => {
                        debug!("Not following directory link {}", path.display())
                    }
                    Ok(_) => files.push(entry.into_path()),
                    Err(err) => {
                        info!("Broken link {}: {}", path.display(), err);
                        files.push(entry.into_path());
                    }
                }
            } else if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            } else if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok((files, dirs))
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.policy
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }
}

/// Ask before touching an unusually large directory. Declining aborts the whole operation.
pub fn check_should_continue_for_large_dir(
    num_of_items: usize,
    threshold: usize,
    confirm: &dyn Confirm,
) -> Result<(), Error> {
    if num_of_items <= threshold {
        return Ok(());
    }

    let prompt = format!(
        "This directory contains more than {} files, are you sure you want to continue?",
        threshold
    );
    if confirm.confirm(&prompt)? {
        Ok(())
    } else {
        Err(Error::Aborted)
    }
}
