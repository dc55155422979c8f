use std::path::Path;

use super::analyze::{FileOutcome, UNSUPPORTED_FILE_MESSAGE};
use super::hash_list::{read_hashes, submit_hashes};
use super::{BatchReport, OpContext};
use crate::api::{IndexRequest, JobStatus};
use crate::batch::{Batch, SummaryLabels, SummaryLine};
use crate::classify::{is_supported_file, FileFilter};
use crate::dispatch::{self, Dispatcher, Operation, Subject, SubmitOutcome};
use crate::error::Error;

/// Index one file and wait for the index job to finish.
pub fn index_file(
    ctx: &OpContext<'_>,
    path: &Path,
    request: IndexRequest,
) -> Result<FileOutcome, Error> {
    if !is_supported_file(path) {
        return Ok(FileOutcome::Unsupported);
    }

    let dispatcher = Dispatcher::new(ctx.api, Operation::Index(request));
    match dispatcher.submit(Subject::File(path)) {
        SubmitOutcome::Accepted(handle) => {
            let status = dispatch::wait_for_completion(
                ctx.api,
                &handle,
                ctx.session.config.poll_interval(),
            )?;
            Ok(FileOutcome::Finished(handle, status))
        }
        SubmitOutcome::Recoverable(failure) => Ok(FileOutcome::Failed(failure.error.to_string())),
        SubmitOutcome::Fatal(failure) => Err(Error::Api(failure.error)),
    }
}

pub fn describe_index(outcome: &FileOutcome) -> SummaryLine {
    match outcome {
        FileOutcome::Unsupported => SummaryLine::Unsupported(UNSUPPORTED_FILE_MESSAGE.to_string()),
        FileOutcome::Submitted(handle) => SummaryLine::Success(format!("Index sent: {}", handle)),
        FileOutcome::Finished(handle, status) => {
            let line = format!("Finish index: {} with status: {}", handle, status);
            if *status == JobStatus::Succeeded {
                SummaryLine::Success(line)
            } else {
                SummaryLine::Failure(line)
            }
        }
        FileOutcome::Failed(message) => SummaryLine::Failure(format!("Index error: {}", message)),
    }
}

/// Send every supported file under `path` for indexing, then wait for all of them.
pub fn index_directory(
    ctx: &OpContext<'_>,
    path: &Path,
    request: IndexRequest,
    ignore_count_limit: bool,
) -> Result<BatchReport, Error> {
    let dispatcher = Dispatcher::new(ctx.api, Operation::Index(request));
    let walker = ctx.walker(
        "Sending files for indexing",
        FileFilter::SupportedFormats,
        ignore_count_limit,
    );
    let batch = walker.walk(path, &dispatcher)?;
    Ok(wait_for_index(ctx, batch))
}

pub fn index_hash_list(
    ctx: &OpContext<'_>,
    path: &Path,
    request: IndexRequest,
) -> Result<BatchReport, Error> {
    let hashes = read_hashes(path)?;
    let dispatcher = Dispatcher::new(ctx.api, Operation::Index(request));
    let batch = submit_hashes(ctx, &hashes, &dispatcher, "Index files")?;
    Ok(wait_for_index(ctx, batch))
}

fn wait_for_index(ctx: &OpContext<'_>, batch: Batch) -> BatchReport {
    let config = &ctx.session.config;
    let mut report = BatchReport::new(
        batch.result,
        SummaryLabels::INDEX,
        ctx.session.results_location(&config.index_results_url),
    );
    report.waited =
        dispatch::wait_for_all(ctx.api, batch.pending, config.poll_interval(), ctx.reporter);
    report
}
