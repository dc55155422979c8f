#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use intezer_analyze_core::api::{
    AlertStatus, AnalysisOptions, AnalyzeApi, ApiError, IndexRequest, JobHandle, JobKind,
    JobStatus,
};
use intezer_analyze_core::endpoint_scan::EndpointScan;
use intezer_analyze_core::{AppConfig, Confirm, OpContext, ProgressReporter, Session};

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Server,
    HashNotFound,
    Quota,
}

/// In-process stand-in for the remote service. Items are keyed by file name or hash.
#[derive(Default)]
pub struct FakeApi {
    pub calls: RefCell<Vec<String>>,
    failures: HashMap<String, Failure>,
    failed_jobs: HashSet<String>,
    alerts: HashMap<String, AlertStatus>,
    /// Accepted submissions before every further one hits the quota.
    quota: Option<usize>,
    invalid_key: bool,
    accepted: Cell<usize>,
    job_origins: RefCell<HashMap<String, String>>,
    polls: RefCell<HashMap<String, usize>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, item: &str, failure: Failure) -> Self {
        self.failures.insert(item.to_string(), failure);
        self
    }

    pub fn with_failed_job(mut self, item: &str) -> Self {
        self.failed_jobs.insert(item.to_string());
        self
    }

    pub fn with_quota(mut self, accepted: usize) -> Self {
        self.quota = Some(accepted);
        self
    }

    pub fn with_alert(mut self, alert_id: &str, status: AlertStatus) -> Self {
        self.alerts.insert(alert_id.to_string(), status);
        self
    }

    pub fn with_invalid_key(mut self) -> Self {
        self.invalid_key = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(&format!("{}:", method)))
            .count()
    }

    fn submit(&self, method: &str, item: &str, kind: JobKind) -> Result<JobHandle, ApiError> {
        self.calls.borrow_mut().push(format!("{}:{}", method, item));

        if self.invalid_key {
            return Err(ApiError::InvalidApiKey);
        }
        if let Some(limit) = self.quota {
            if self.accepted.get() >= limit {
                return Err(ApiError::InsufficientQuota);
            }
        }
        match self.failures.get(item) {
            Some(Failure::Server) => {
                return Err(ApiError::Server {
                    status: 500,
                    message: "internal error".to_string(),
                })
            }
            Some(Failure::HashNotFound) => return Err(ApiError::HashNotFound(item.to_string())),
            Some(Failure::Quota) => return Err(ApiError::InsufficientQuota),
            None => {}
        }

        self.accepted.set(self.accepted.get() + 1);
        let id = format!("job-{}", self.accepted.get());
        self.job_origins
            .borrow_mut()
            .insert(id.clone(), item.to_string());
        Ok(JobHandle::new(kind, id))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl AnalyzeApi for FakeApi {
    fn authenticate(&self) -> Result<(), ApiError> {
        self.calls.borrow_mut().push("authenticate:".to_string());
        if self.invalid_key {
            Err(ApiError::InvalidApiKey)
        } else {
            Ok(())
        }
    }

    fn analyze_file(&self, path: &Path, _options: &AnalysisOptions) -> Result<JobHandle, ApiError> {
        self.submit("analyze_file", &file_name(path), JobKind::Analysis)
    }

    fn analyze_hash(&self, hash: &str) -> Result<JobHandle, ApiError> {
        self.submit("analyze_hash", hash, JobKind::Analysis)
    }

    fn index_file(&self, path: &Path, _request: &IndexRequest) -> Result<JobHandle, ApiError> {
        self.submit("index_file", &file_name(path), JobKind::Index)
    }

    fn index_hash(&self, sha256: &str, _request: &IndexRequest) -> Result<JobHandle, ApiError> {
        self.submit("index_hash", sha256, JobKind::Index)
    }

    fn submit_endpoint_scan(&self, scan: &EndpointScan) -> Result<JobHandle, ApiError> {
        self.submit("submit_endpoint_scan", &file_name(&scan.dir), JobKind::EndpointScan)
    }

    fn submit_phishing_email(&self, path: &Path) -> Result<JobHandle, ApiError> {
        self.submit("submit_phishing_email", &file_name(path), JobKind::Alert)
    }

    fn get_alert_status(&self, alert_id: &str) -> Result<AlertStatus, ApiError> {
        self.calls
            .borrow_mut()
            .push(format!("get_alert_status:{}", alert_id));
        self.alerts
            .get(alert_id)
            .copied()
            .ok_or_else(|| ApiError::AlertNotFound(alert_id.to_string()))
    }

    fn notify_alert(&self, alert_id: &str) -> Result<usize, ApiError> {
        self.submit("notify_alert", alert_id, JobKind::Alert)
            .map(|_| 1)
    }

    /// Every job reports in-progress once before resolving.
    fn get_job_status(&self, handle: &JobHandle) -> Result<JobStatus, ApiError> {
        let mut polls = self.polls.borrow_mut();
        let count = polls.entry(handle.id.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            return Ok(JobStatus::InProgress);
        }

        let origin = self
            .job_origins
            .borrow()
            .get(&handle.id)
            .cloned()
            .unwrap_or_default();
        if self.failed_jobs.contains(&origin) {
            Ok(JobStatus::Failed("analysis failed".to_string()))
        } else {
            Ok(JobStatus::Succeeded)
        }
    }
}

pub struct FakeConfirm {
    answer: bool,
    pub prompts: RefCell<Vec<String>>,
}

impl FakeConfirm {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl Confirm for FakeConfirm {
    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.answer)
    }
}

#[derive(Default)]
pub struct CountingReporter {
    pub batches: Cell<usize>,
    pub ticks: Cell<usize>,
    pub completed: Cell<usize>,
    pub waited: Cell<usize>,
}

impl ProgressReporter for CountingReporter {
    fn on_batch_start(&self, _label: &str, _len: usize) {
        self.batches.set(self.batches.get() + 1);
    }

    fn on_item_done(&self) {
        self.ticks.set(self.ticks.get() + 1);
    }

    fn on_batch_complete(&self) {
        self.completed.set(self.completed.get() + 1);
    }

    fn on_wait_progress(&self, resolved: usize) {
        self.waited.set(resolved);
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        poll_interval_secs: 0,
        ..AppConfig::default()
    }
}

pub fn cloud_session(config: AppConfig) -> Session {
    Session::new(config, "a1b2c3d4-0000-4000-8000-000000000000".to_string(), None)
}

pub fn context<'a>(
    session: &'a Session,
    api: &'a FakeApi,
    confirm: &'a FakeConfirm,
    reporter: &'a CountingReporter,
) -> OpContext<'a> {
    OpContext {
        session,
        api,
        confirm,
        reporter,
    }
}

pub fn write_pe(path: &Path) {
    fs::write(path, b"MZ\x90\x00\x03\x00\x00\x00").unwrap();
}

pub fn write_elf(path: &Path) {
    fs::write(path, b"\x7fELF\x02\x01\x01").unwrap();
}
