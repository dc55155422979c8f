//! The remote analysis service, seen through the operations this client needs.

mod http;

pub use http::HttpApi;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::endpoint_scan::EndpointScan;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Insufficient quota")]
    InsufficientQuota,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Hash {0} does not exist in the system")]
    HashNotFound(String),

    #[error("Alert {0} was not found")]
    AlertNotFound(String),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed reading {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeItemType {
    File,
    MemoryModule,
    FilelessCode,
}

impl CodeItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeItemType::File => "file",
            CodeItemType::MemoryModule => "memory_module",
            CodeItemType::FilelessCode => "fileless_code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexAs {
    Trusted,
    Malicious,
}

impl IndexAs {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexAs::Trusted => "trusted",
            IndexAs::Malicious => "malicious",
        }
    }
}

impl FromStr for IndexAs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trusted" => Ok(IndexAs::Trusted),
            "malicious" => Ok(IndexAs::Malicious),
            other => Err(format!("invalid index type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub disable_dynamic_unpacking: bool,
    pub disable_static_unpacking: bool,
    pub code_item_type: Option<CodeItemType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRequest {
    pub index_as: IndexAs,
    /// Required when indexing as malicious.
    pub family_name: Option<String>,
}

impl IndexRequest {
    pub fn new(index_as: IndexAs, family_name: Option<String>) -> Result<Self, String> {
        if index_as == IndexAs::Malicious && family_name.is_none() {
            return Err("family_name is mandatory if the index type is malicious".to_string());
        }
        Ok(Self {
            index_as,
            family_name,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Analysis,
    Index,
    EndpointScan,
    Alert,
}

/// Remote reference to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub kind: JobKind,
    pub id: String,
}

impl JobHandle {
    pub fn new(kind: JobKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Succeeded,
    Failed(String),
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::InProgress => f.write_str("in_progress"),
            JobStatus::Succeeded => f.write_str("succeeded"),
            JobStatus::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    InProgress,
    Complete,
}

pub trait AnalyzeApi {
    /// Verify the API key by exchanging it for an access token.
    fn authenticate(&self) -> Result<(), ApiError>;
    fn analyze_file(&self, path: &Path, options: &AnalysisOptions) -> Result<JobHandle, ApiError>;
    fn analyze_hash(&self, hash: &str) -> Result<JobHandle, ApiError>;
    fn index_file(&self, path: &Path, request: &IndexRequest) -> Result<JobHandle, ApiError>;
    fn index_hash(&self, sha256: &str, request: &IndexRequest) -> Result<JobHandle, ApiError>;
    /// Upload an offline endpoint scan. The returned handle holds the analysis id.
    fn submit_endpoint_scan(&self, scan: &EndpointScan) -> Result<JobHandle, ApiError>;
    fn submit_phishing_email(&self, path: &Path) -> Result<JobHandle, ApiError>;
    fn get_alert_status(&self, alert_id: &str) -> Result<AlertStatus, ApiError>;
    /// Returns the number of channels that were notified.
    fn notify_alert(&self, alert_id: &str) -> Result<usize, ApiError>;
    fn get_job_status(&self, handle: &JobHandle) -> Result<JobStatus, ApiError>;
}
