use std::path::Path;

use tracing::{debug, info};

use super::{BatchReport, OpContext};
use crate::api::{AlertStatus, JobHandle, JobKind};
use crate::batch::{Batch, SummaryLabels};
use crate::dispatch::SubmitOutcome;
use crate::error::Error;

const ID_COLUMNS: [&str; 2] = ["alert_id", "id"];

/// Alert ids from the `alert_id` column, or `id` when there is none.
pub fn read_alert_ids(path: &Path) -> Result<Vec<String>, Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let column = ID_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
        .ok_or_else(|| {
            Error::Other(format!(
                "{} has no alert_id column",
                path.display()
            ))
        })?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        match record.get(column).map(str::trim) {
            Some(id) if !id.is_empty() => ids.push(id.to_string()),
            _ => debug!("Skipping row without alert id at {:?}", record.position()),
        }
    }
    Ok(ids)
}

/// Notify every completed alert listed in the CSV. Alerts still running are skipped.
pub fn notify_alerts_from_csv(ctx: &OpContext<'_>, path: &Path) -> Result<BatchReport, Error> {
    let alert_ids = read_alert_ids(path)?;
    let mut batch = Batch::new();
    let mut stopped = None;

    ctx.reporter.on_batch_start("Notifying alerts", alert_ids.len());
    for alert_id in &alert_ids {
        let recorded = match ctx.api.get_alert_status(alert_id) {
            Ok(AlertStatus::InProgress) => {
                info!("Alert {} is still in progress, not notifying", alert_id);
                batch.unsupported();
                Ok(())
            }
            Ok(AlertStatus::Complete) => {
                let notified = ctx.api.notify_alert(alert_id).map(|channels| {
                    debug!("Alert {} notified {} channels", alert_id, channels);
                    JobHandle::new(JobKind::Alert, alert_id.as_str())
                });
                batch.record(alert_id.clone(), SubmitOutcome::from_result(notified))
            }
            Err(e) => batch.record(alert_id.clone(), SubmitOutcome::from_result(Err(e))),
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
        SummaryLabels::ALERTS,
        ctx.session.results_location(&ctx.session.config.alerts_url),
    ))
}
