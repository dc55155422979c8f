use std::path::Path;

use super::hash_list::{read_hashes, submit_hashes};
use super::{BatchReport, OpContext};
use crate::api::{AnalysisOptions, JobHandle, JobStatus};
use crate::batch::{SummaryLabels, SummaryLine};
use crate::classify::{is_supported_file, FileFilter};
use crate::config::Session;
use crate::dispatch::{self, Dispatcher, Operation, Subject, SubmitOutcome};
use crate::error::Error;

pub const UNSUPPORTED_FILE_MESSAGE: &str = "File is not PE, ELF, DEX or APK";

#[derive(Debug)]
pub enum FileOutcome {
    Unsupported,
    Submitted(JobHandle),
    Finished(JobHandle, JobStatus),
    Failed(String),
}

/// Send one file. Without dynamic unpacking only recognised executables are sent.
pub fn analyze_file(
    ctx: &OpContext<'_>,
    path: &Path,
    options: AnalysisOptions,
    wait: bool,
) -> Result<FileOutcome, Error> {
    if options.disable_dynamic_unpacking && !is_supported_file(path) {
        return Ok(FileOutcome::Unsupported);
    }

    let dispatcher = Dispatcher::new(ctx.api, Operation::Analyze(options));
    match dispatcher.submit(Subject::File(path)) {
        SubmitOutcome::Accepted(handle) if wait => {
            let status = dispatch::wait_for_completion(
                ctx.api,
                &handle,
                ctx.session.config.poll_interval(),
            )?;
            Ok(FileOutcome::Finished(handle, status))
        }
        SubmitOutcome::Accepted(handle) => Ok(FileOutcome::Submitted(handle)),
        SubmitOutcome::Recoverable(failure) => Ok(FileOutcome::Failed(failure.error.to_string())),
        SubmitOutcome::Fatal(failure) => Err(Error::Api(failure.error)),
    }
}

pub fn describe_analysis(outcome: &FileOutcome, session: &Session) -> SummaryLine {
    let location = |handle: &JobHandle| {
        if session.is_cloud {
            format!("go to: {}", session.analysis_url(&handle.id))
        } else {
            session.results_location("")
        }
    };

    match outcome {
        FileOutcome::Unsupported => SummaryLine::Unsupported(UNSUPPORTED_FILE_MESSAGE.to_string()),
        FileOutcome::Submitted(handle) => SummaryLine::Success(format!(
            "Analysis created. In order to check its result, {}",
            location(handle)
        )),
        FileOutcome::Finished(handle, JobStatus::Succeeded) => SummaryLine::Success(format!(
            "Analysis {} finished. In order to check its result, {}",
            handle,
            location(handle)
        )),
        FileOutcome::Finished(handle, status) => {
            SummaryLine::Failure(format!("Analysis {} finished with status: {}", handle, status))
        }
        FileOutcome::Failed(message) => SummaryLine::Failure(format!("Analyze error: {}", message)),
    }
}

pub fn analyze_directory(
    ctx: &OpContext<'_>,
    path: &Path,
    options: AnalysisOptions,
    ignore_count_limit: bool,
    wait: bool,
) -> Result<BatchReport, Error> {
    let filter = if options.disable_dynamic_unpacking {
        FileFilter::SupportedFormats
    } else {
        FileFilter::NonEmpty
    };
    let dispatcher = Dispatcher::new(ctx.api, Operation::Analyze(options));
    let walker = ctx.walker("Sending files for analysis", filter, ignore_count_limit);
    let batch = walker.walk(path, &dispatcher)?;

    let config = &ctx.session.config;
    let mut report = BatchReport::new(
        batch.result,
        SummaryLabels::ANALYSIS,
        ctx.session.results_location(&config.analyses_url),
    );
    if wait {
        report.waited =
            dispatch::wait_for_all(ctx.api, batch.pending, config.poll_interval(), ctx.reporter);
    }
    Ok(report)
}

pub fn analyze_hash_list(ctx: &OpContext<'_>, path: &Path, wait: bool) -> Result<BatchReport, Error> {
    let hashes = read_hashes(path)?;
    let dispatcher = Dispatcher::new(ctx.api, Operation::Analyze(AnalysisOptions::default()));
    let batch = submit_hashes(ctx, &hashes, &dispatcher, "Analyze files")?;

    let config = &ctx.session.config;
    let mut report = BatchReport::new(
        batch.result,
        SummaryLabels::HASH_ANALYSIS,
        ctx.session.results_location(&config.analyses_url),
    );
    if wait {
        report.waited =
            dispatch::wait_for_all(ctx.api, batch.pending, config.poll_interval(), ctx.reporter);
    }
    Ok(report)
}
