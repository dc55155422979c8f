pub mod api;
pub mod batch;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod endpoint_scan;
pub mod error;
pub mod key_store;
pub mod marker;
pub mod ops;
pub mod platform;
pub mod progress;
pub mod walker;

pub use api::{AnalyzeApi, ApiError, HttpApi};
pub use batch::{BatchResult, SummaryLine};
pub use config::{AppConfig, Session};
pub use error::Error;
pub use key_store::KeyStore;
pub use ops::{BatchReport, OpContext};
pub use progress::{ProgressReporter, SilentReporter};
pub use walker::Confirm;
