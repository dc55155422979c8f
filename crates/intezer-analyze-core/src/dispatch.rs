use std::path::Path;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::api::{AnalysisOptions, AnalyzeApi, ApiError, IndexRequest, JobHandle, JobStatus};
use crate::progress::ProgressReporter;

/// What a batch does with every accepted item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Analyze(AnalysisOptions),
    Index(IndexRequest),
    PhishingEmail,
}

#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    File(&'a Path),
    Hash(&'a str),
}

impl Subject<'_> {
    pub fn label(&self) -> String {
        match self {
            Subject::File(path) => path.display().to_string(),
            Subject::Hash(hash) => hash.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    QuotaExhausted,
    InvalidApiKey,
    NotFound,
    Api,
    Unexpected,
}

impl FailureKind {
    /// Quota and credential failures apply to every later submission too.
    pub fn is_fatal(self) -> bool {
        matches!(self, FailureKind::QuotaExhausted | FailureKind::InvalidApiKey)
    }
}

#[derive(Debug)]
pub struct SubmitFailure {
    pub kind: FailureKind,
    pub error: ApiError,
}

impl SubmitFailure {
    fn from_error(error: ApiError) -> Self {
        let kind = match &error {
            ApiError::InsufficientQuota => FailureKind::QuotaExhausted,
            ApiError::InvalidApiKey => FailureKind::InvalidApiKey,
            ApiError::HashNotFound(_) | ApiError::AlertNotFound(_) => FailureKind::NotFound,
            ApiError::Server { .. } | ApiError::Transport(_) | ApiError::UnexpectedResponse(_) => {
                FailureKind::Api
            }
            ApiError::File { .. } | ApiError::InvalidRequest(_) => FailureKind::Unexpected,
        };
        Self { kind, error }
    }
}

/// Tagged submission result. `Fatal` must stop the surrounding batch.
#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted(JobHandle),
    Recoverable(SubmitFailure),
    Fatal(SubmitFailure),
}

impl SubmitOutcome {
    pub fn from_result(result: Result<JobHandle, ApiError>) -> Self {
        match result {
            Ok(handle) => SubmitOutcome::Accepted(handle),
            Err(error) => {
                let failure = SubmitFailure::from_error(error);
                if failure.kind.is_fatal() {
                    SubmitOutcome::Fatal(failure)
                } else {
                    SubmitOutcome::Recoverable(failure)
                }
            }
        }
    }
}

pub struct Dispatcher<'a> {
    api: &'a dyn AnalyzeApi,
    operation: Operation,
}

impl<'a> Dispatcher<'a> {
    pub fn new(api: &'a dyn AnalyzeApi, operation: Operation) -> Self {
        Self { api, operation }
    }

    pub fn submit(&self, subject: Subject<'_>) -> SubmitOutcome {
        let result = match (&self.operation, subject) {
            (Operation::Analyze(options), Subject::File(path)) => self.api.analyze_file(path, options),
            (Operation::Analyze(_), Subject::Hash(hash)) => self.api.analyze_hash(hash),
            (Operation::Index(request), Subject::File(path)) => self.api.index_file(path, request),
            (Operation::Index(request), Subject::Hash(sha256)) => self.api.index_hash(sha256, request),
            (Operation::PhishingEmail, Subject::File(path)) => self.api.submit_phishing_email(path),
            (Operation::PhishingEmail, Subject::Hash(_)) => Err(ApiError::InvalidRequest(
                "phishing emails can only be sent as files".to_string(),
            )),
        };

        let outcome = SubmitOutcome::from_result(result);
        match &outcome {
            SubmitOutcome::Accepted(handle) => debug!("Submitted {} as {}", subject.label(), handle),
            SubmitOutcome::Recoverable(failure) => warn!(
                "Failed to submit {} ({:?}): {}",
                subject.label(),
                failure.kind,
                failure.error
            ),
            SubmitOutcome::Fatal(failure) => error!(
                "Failed to submit {} ({:?}): {}",
                subject.label(),
                failure.kind,
                failure.error
            ),
        }
        outcome
    }
}

/// An accepted submission whose remote job has not been resolved yet.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub handle: JobHandle,
    pub origin: String,
    pub submitted_at: DateTime<Utc>,
}

impl PendingOperation {
    pub fn new(handle: JobHandle, origin: String) -> Self {
        Self {
            handle,
            origin,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub struct WaitResult {
    pub operation: PendingOperation,
    pub status: Result<JobStatus, ApiError>,
}

impl WaitResult {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, Ok(JobStatus::Succeeded))
    }
}

/// Poll every pending operation to a terminal status, one after the other.
pub fn wait_for_all(
    api: &dyn AnalyzeApi,
    pending: Vec<PendingOperation>,
    poll_interval: Duration,
    reporter: &dyn ProgressReporter,
) -> Vec<WaitResult> {
    reporter.on_wait_start(pending.len());
    let mut results = Vec::with_capacity(pending.len());

    for (resolved, operation) in pending.into_iter().enumerate() {
        let status = wait_for_completion(api, &operation.handle, poll_interval);
        match &status {
            Ok(status) => debug!(
                "{} ({}) finished with status {} after {}s",
                operation.handle,
                operation.origin,
                status,
                (Utc::now() - operation.submitted_at).num_seconds()
            ),
            Err(e) => error!("Failed waiting for {} ({}): {}", operation.handle, operation.origin, e),
        }
        results.push(WaitResult { operation, status });
        reporter.on_wait_progress(resolved + 1);
    }

    reporter.on_wait_complete();
    results
}

pub fn wait_for_completion(
    api: &dyn AnalyzeApi,
    handle: &JobHandle,
    poll_interval: Duration,
) -> Result<JobStatus, ApiError> {
    loop {
        match api.get_job_status(handle)? {
            JobStatus::InProgress => thread::sleep(poll_interval),
            terminal => return Ok(terminal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_and_invalid_key_are_fatal() {
        assert!(matches!(
            SubmitOutcome::from_result(Err(ApiError::InsufficientQuota)),
            SubmitOutcome::Fatal(SubmitFailure {
                kind: FailureKind::QuotaExhausted,
                ..
            })
        ));
        assert!(matches!(
            SubmitOutcome::from_result(Err(ApiError::InvalidApiKey)),
            SubmitOutcome::Fatal(_)
        ));
    }

    #[test]
    fn test_only_quota_and_credentials_kinds_are_fatal() {
        assert!(FailureKind::QuotaExhausted.is_fatal());
        assert!(FailureKind::InvalidApiKey.is_fatal());
        assert!(!FailureKind::NotFound.is_fatal());
        assert!(!FailureKind::Api.is_fatal());
        assert!(!FailureKind::Unexpected.is_fatal());
    }

    #[test]
    fn test_item_errors_are_recoverable() {
        assert!(matches!(
            SubmitOutcome::from_result(Err(ApiError::HashNotFound("aa".to_string()))),
            SubmitOutcome::Recoverable(SubmitFailure {
                kind: FailureKind::NotFound,
                ..
            })
        ));
        assert!(matches!(
            SubmitOutcome::from_result(Err(ApiError::Server {
                status: 500,
                message: "boom".to_string()
            })),
            SubmitOutcome::Recoverable(SubmitFailure {
                kind: FailureKind::Api,
                ..
            })
        ));
    }
}
