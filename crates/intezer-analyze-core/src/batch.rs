use crate::dispatch::{PendingOperation, SubmitFailure, SubmitOutcome};

/// Every recorded item lands in exactly one of the three counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub unsupported_count: usize,
    pub errors: Vec<String>,
}

/// Wording for the end-of-batch summary.
#[derive(Debug, Clone, Copy)]
pub struct SummaryLabels {
    pub created: &'static str,
    pub failed: &'static str,
    pub unsupported: &'static str,
}

impl SummaryLabels {
    pub const ANALYSIS: SummaryLabels = SummaryLabels {
        created: "analysis created",
        failed: "analysis failed",
        unsupported: "unsupported files",
    };
    pub const HASH_ANALYSIS: SummaryLabels = SummaryLabels {
        created: "analysis created",
        failed: "hashes failed",
        unsupported: "invalid hashes",
    };
    pub const INDEX: SummaryLabels = SummaryLabels {
        created: "indexing sent",
        failed: "indexing failed",
        unsupported: "unsupported files",
    };
    pub const EMAILS: SummaryLabels = SummaryLabels {
        created: "emails sent for analysis",
        failed: "emails failed",
        unsupported: "empty or unreadable files",
    };
    pub const ENDPOINT_SCANS: SummaryLabels = SummaryLabels {
        created: "endpoint scans uploaded",
        failed: "endpoint scans failed",
        unsupported: "endpoint scans already uploaded",
    };
    pub const ALERTS: SummaryLabels = SummaryLabels {
        created: "alerts notified",
        failed: "alerts failed",
        unsupported: "alerts still in progress",
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryLine {
    Success(String),
    Failure(String),
    Unsupported(String),
    Error(String),
}

impl SummaryLine {
    pub fn text(&self) -> &str {
        match self {
            SummaryLine::Success(s)
            | SummaryLine::Failure(s)
            | SummaryLine::Unsupported(s)
            | SummaryLine::Error(s) => s,
        }
    }
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.success_count + self.failed_count + self.unsupported_count
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, message: String) {
        self.failed_count += 1;
        self.errors.push(message);
    }

    pub fn record_unsupported(&mut self) {
        self.unsupported_count += 1;
    }

    /// Human-readable summary. `results_location` tells the user where to look.
    pub fn summary_lines(&self, labels: &SummaryLabels, results_location: &str) -> Vec<SummaryLine> {
        let mut lines = Vec::new();

        if self.success_count != 0 {
            lines.push(SummaryLine::Success(format!(
                "{} {}. In order to check their results, {}",
                self.success_count, labels.created, results_location
            )));
        }
        if self.failed_count != 0 {
            lines.push(SummaryLine::Failure(format!(
                "{} {}",
                self.failed_count, labels.failed
            )));
        }
        if self.unsupported_count != 0 {
            lines.push(SummaryLine::Unsupported(format!(
                "{} {}",
                self.unsupported_count, labels.unsupported
            )));
        }
        for error in &self.errors {
            lines.push(SummaryLine::Error(error.clone()));
        }

        lines
    }
}

/// Batch accounting plus the accepted jobs that may still be polled.
#[derive(Debug, Default)]
pub struct Batch {
    pub result: BatchResult,
    pub pending: Vec<PendingOperation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unsupported(&mut self) {
        self.result.record_unsupported();
    }

    /// Record a dispatcher outcome. A fatal outcome is counted as failed and handed back.
    pub fn record(
        &mut self,
        subject: String,
        outcome: SubmitOutcome,
    ) -> Result<(), SubmitFailure> {
        match outcome {
            SubmitOutcome::Accepted(handle) => {
                self.pending.push(PendingOperation::new(handle, subject));
                self.result.record_success();
                Ok(())
            }
            SubmitOutcome::Recoverable(failure) => {
                let message = format!("{}: {}", subject, failure.error);
                self.result.record_failure(message);
                Ok(())
            }
            SubmitOutcome::Fatal(failure) => {
                let message = format!("{}: {}", subject, failure.error);
                self.result.record_failure(message);
                Err(failure)
            }
        }
    }
}
