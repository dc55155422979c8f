use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Cant find API key, please login")]
    NotLoggedIn,

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Marker file {} could not be accessed: {source}", path.display())]
    Marker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Endpoint scan was uploaded as analysis {analysis_id} but marker file {} could not be written: {source}",
        path.display()
    )]
    MarkerNotWritten {
        path: PathBuf,
        analysis_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No read permissions for {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan in {} was already uploaded as analysis {analysis_id}", dir.display())]
    AlreadyUploaded { dir: PathBuf, analysis_id: String },

    #[error("{} is not an offline endpoint scan directory (missing {missing})", dir.display())]
    NotAnEndpointScan { dir: PathBuf, missing: &'static str },

    #[error("Aborted!")]
    Aborted,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors that end the whole batch rather than a single item.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Error::Api(ApiError::InsufficientQuota))
    }
}
