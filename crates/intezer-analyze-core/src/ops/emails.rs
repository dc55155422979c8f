use std::path::Path;

use super::{BatchReport, OpContext};
use crate::batch::SummaryLabels;
use crate::classify::FileFilter;
use crate::dispatch::{Dispatcher, Operation};
use crate::error::Error;

/// Send every non-empty file under `path` as a phishing email.
pub fn upload_emails_in_directory(
    ctx: &OpContext<'_>,
    path: &Path,
    ignore_count_limit: bool,
) -> Result<BatchReport, Error> {
    let dispatcher = Dispatcher::new(ctx.api, Operation::PhishingEmail);
    let walker = ctx.walker(
        "Sending emails for analysis",
        FileFilter::NonEmpty,
        ignore_count_limit,
    );
    let batch = walker.walk(path, &dispatcher)?;

    Ok(BatchReport::new(
        batch.result,
        SummaryLabels::EMAILS,
        ctx.session.results_location(&ctx.session.config.alerts_url),
    ))
}
