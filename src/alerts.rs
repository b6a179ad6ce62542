//! Alert building, silencing, and the missing-report detector.
//!
//! The same shape as ingestion's reconciliation: match many records against
//! many candidate keys, partially reject, and replace the persisted slice
//! idempotently.

mod build;
mod silence;

use std::collections::HashSet;

use jiff::{Span, Timestamp};
use tracing::info;

use crate::model::VesselAtRisk;
use crate::storage::Storage;

pub use build::build_alerts;
pub use silence::remove_silenced;

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("invalid time window: {0}")]
    Window(#[from] jiff::Error),
}

pub type Result<T> = core::result::Result<T, AlertError>;

/// Vessels at sea that did not emit the required fishing report.
///
/// A candidate that cannot be matched to any report (no internal reference
/// number) is kept: it certainly has not reported.
pub fn missing_reports(
    at_sea: Vec<VesselAtRisk>,
    reported: &HashSet<String>,
) -> Vec<VesselAtRisk> {
    at_sea
        .into_iter()
        .filter(|vessel| match &vessel.internal_reference_number {
            Some(cfr) => !reported.contains(cfr),
            None => true,
        })
        .collect()
}

/// Rebuilds the pending alerts for vessels missing a fishing report.
///
/// Detect → build → silence → replace, in that order. The replace is keyed
/// by `alert_config_name` and runs even when no vessel qualifies: an empty
/// result is itself the correct outcome. Returns the number of alerts
/// loaded.
pub fn run_missing_reports(
    storage: &mut Storage,
    alert_type: &str,
    alert_config_name: &str,
    window_hours: i64,
) -> Result<usize> {
    let now = Timestamp::now();
    let window_start = now.checked_sub(Span::new().hours(window_hours))?;
    // Declarations trail the activity they describe; look back twice as far.
    let declaration_start = now.checked_sub(Span::new().hours(window_hours * 2))?;

    let at_sea = storage.vessels_at_sea(window_start, now)?;
    let reported =
        storage.vessels_with_fishing_operations(declaration_start, now, window_start, now)?;
    let missing = missing_reports(at_sea, &reported);
    info!(
        candidates = missing.len(),
        alert_type, "vessels with missing fishing reports"
    );

    let alerts = build_alerts(missing, alert_type, alert_config_name, now);
    let silenced = storage.silenced_alerts(now)?;
    let alerts = remove_silenced(alerts, &silenced);

    storage.replace_pending_alerts(alert_config_name, &alerts)?;
    Ok(alerts.len())
}
