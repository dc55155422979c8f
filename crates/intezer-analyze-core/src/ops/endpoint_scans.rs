use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use walkdir::WalkDir;

use super::{BatchReport, OpContext};
use crate::api::JobHandle;
use crate::batch::{Batch, SummaryLabels, SummaryLine};
use crate::config::Session;
use crate::dispatch::SubmitOutcome;
use crate::endpoint_scan::{is_endpoint_scan_dir, EndpointScan};
use crate::error::Error;
use crate::marker::ScanMarker;
use crate::platform;

/// Upload one offline scan directory and record its analysis id next to it.
///
/// A directory that already carries an analysis id is refused before anything
/// is sent, unless `force` is set.
pub fn upload_endpoint_scan(
    ctx: &OpContext<'_>,
    dir: &Path,
    force: bool,
) -> Result<JobHandle, Error> {
    let marker = ScanMarker::new(dir, &ctx.session.config.marker_file_name);
    marker.ensure_not_uploaded(dir, force)?;

    let scan = EndpointScan::load(dir)?;
    let handle = ctx.api.submit_endpoint_scan(&scan)?;
    marker.write(&handle.id).map_err(|err| match err {
        Error::Marker { path, source } => Error::MarkerNotWritten {
            path,
            analysis_id: handle.id.clone(),
            source,
        },
        other => other,
    })?;

    info!("Uploaded endpoint scan {} as analysis {}", dir.display(), handle);
    Ok(handle)
}

pub fn describe_endpoint_scan(handle: &JobHandle, session: &Session) -> SummaryLine {
    let location = if session.is_cloud {
        format!("go to: {}", session.analysis_url(&handle.id))
    } else {
        session.results_location("")
    };
    SummaryLine::Success(format!(
        "Endpoint scan uploaded. In order to check its result, {}",
        location
    ))
}

/// Upload every scan directory directly under `root`.
pub fn upload_endpoint_scans_in_directory(
    ctx: &OpContext<'_>,
    root: &Path,
    force: bool,
) -> Result<BatchReport, Error> {
    let scan_dirs = list_scan_dirs(root)?;
    let mut batch = Batch::new();
    let mut stopped = None;

    ctx.reporter
        .on_batch_start("Uploading endpoint scans", scan_dirs.len());
    for dir in &scan_dirs {
        let subject = dir.display().to_string();
        let recorded = match upload_endpoint_scan(ctx, dir, force) {
            Ok(handle) => batch.record(subject, SubmitOutcome::Accepted(handle)),
            Err(Error::AlreadyUploaded { analysis_id, .. }) => {
                warn!("Skipping {}: already uploaded as {}", subject, analysis_id);
                batch.unsupported();
                Ok(())
            }
            Err(Error::Api(e)) => batch.record(subject, SubmitOutcome::from_result(Err(e))),
            Err(other) => {
                error!("Failed uploading endpoint scan {}: {}", subject, other);
                let message = format!("{}: {}", subject, other);
                batch.result.record_failure(message);
                Ok(())
            }
        };
        ctx.reporter.on_item_done();

        if let Err(failure) = recorded {
            stopped = Some(failure);
            break;
        }
    }
    ctx.reporter.on_batch_complete();

    if let Some(failure) = stopped {
        return Err(Error::Api(failure.error));
    }

    Ok(BatchReport::new(
        batch.result,
        SummaryLabels::ENDPOINT_SCANS,
        ctx.session.results_location(&ctx.session.config.analyses_url),
    ))
}

fn list_scan_dirs(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(io::Error::from(e)))?;
        let path = entry.path();
        // is_dir() follows links, so a linked scan directory is uploaded too
        if path.is_dir() && !platform::is_hidden(path) && is_endpoint_scan_dir(path) {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}
