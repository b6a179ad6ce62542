//! Alert builder: one alert row per vessel in alert.

use jiff::Timestamp;
use serde_json::json;

use crate::model::{Alert, VesselAtRisk};

/// Builds one alert per candidate, shaped for the `pending_alerts` table.
///
/// A candidate without a creation date gets `now`. The `value` payload is
/// derived from (facade, flag state, type, risk factor) and carries the
/// type and facade into storage; they are not persisted as columns.
pub fn build_alerts(
    candidates: Vec<VesselAtRisk>,
    alert_type: &str,
    alert_config_name: &str,
    now: Timestamp,
) -> Vec<Alert> {
    candidates
        .into_iter()
        .map(|vessel| {
            let value = json!({
                "seaFront": vessel.facade,
                "flagState": vessel.flag_state,
                "type": alert_type,
                "riskFactor": vessel.risk_factor,
            });
            Alert {
                vessel_name: vessel.vessel_name,
                internal_reference_number: vessel.internal_reference_number,
                external_reference_number: vessel.external_reference_number,
                ircs: vessel.ircs,
                vessel_identifier: vessel.vessel_identifier,
                creation_date: vessel.creation_date.unwrap_or(now),
                alert_type: alert_type.to_string(),
                facade: vessel.facade,
                value,
                alert_config_name: alert_config_name.to_string(),
            }
        })
        .collect()
}
