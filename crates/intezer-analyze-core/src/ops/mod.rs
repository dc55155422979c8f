//! One entry point per command. Operations never print; they return reports.

pub mod alerts;
pub mod analyze;
pub mod emails;
pub mod endpoint_scans;
pub mod hash_list;
pub mod index;
pub mod login;

use crate::api::{AnalyzeApi, JobStatus};
use crate::batch::{BatchResult, SummaryLabels, SummaryLine};
use crate::classify::FileFilter;
use crate::config::Session;
use crate::dispatch::WaitResult;
use crate::progress::ProgressReporter;
use crate::walker::{Confirm, DirectoryWalker, WalkPolicy};

/// Everything an operation may touch, passed in explicitly.
pub struct OpContext<'a> {
    pub session: &'a Session,
    pub api: &'a dyn AnalyzeApi,
    pub confirm: &'a dyn Confirm,
    pub reporter: &'a dyn ProgressReporter,
}

impl<'a> OpContext<'a> {
    pub(crate) fn walker(
        &self,
        label: &str,
        filter: FileFilter,
        ignore_count_limit: bool,
    ) -> DirectoryWalker<'a> {
        let policy = WalkPolicy {
            label: label.to_string(),
            filter,
            threshold: self.session.config.unusual_amount_in_dir,
            ignore_count_limit,
            ignore_patterns: self.session.config.ignore_globs(),
        };
        DirectoryWalker::new(policy, self.confirm, self.reporter)
    }
}

/// Outcome of a batch command, ready for display.
#[derive(Debug)]
pub struct BatchReport {
    pub result: BatchResult,
    /// Empty unless the command waited for its jobs.
    pub waited: Vec<WaitResult>,
    pub labels: SummaryLabels,
    pub results_location: String,
}

impl BatchReport {
    pub fn new(result: BatchResult, labels: SummaryLabels, results_location: String) -> Self {
        Self {
            result,
            waited: Vec::new(),
            labels,
            results_location,
        }
    }

    pub fn wait_failures(&self) -> usize {
        self.waited.iter().filter(|w| !w.succeeded()).count()
    }

    pub fn lines(&self) -> Vec<SummaryLine> {
        let mut lines = self
            .result
            .summary_lines(&self.labels, &self.results_location);

        if self.waited.is_empty() {
            return lines;
        }

        let finished = self.waited.len() - self.wait_failures();
        lines.push(SummaryLine::Success(format!(
            "{} of {} finished successfully",
            finished,
            self.waited.len()
        )));
        for waited in self.waited.iter().filter(|w| !w.succeeded()) {
            let reason = match &waited.status {
                Ok(JobStatus::Failed(reason)) => reason.clone(),
                Ok(status) => status.to_string(),
                Err(e) => e.to_string(),
            };
            lines.push(SummaryLine::Error(format!(
                "{} ({}) failed: {}",
                waited.operation.origin, waited.operation.handle, reason
            )));
        }
        lines
    }
}
