//! Alert storage: the pending-alerts replace and its collaborator reads.

use jiff::Timestamp;
use rusqlite::params;
use serde_json::Value;

use crate::model::{Alert, SilencedAlert, VesselAtRisk, VesselIdentifier};

use super::{Result, Storage, StorageError};

impl Storage {
    /// Idempotently replaces the pending alerts of one config name.
    ///
    /// Deletes every persisted row carrying `alert_config_name`, then
    /// appends the new batch, inside one transaction, so the table is
    /// never observed empty or doubled. The delete runs even for an empty
    /// batch: no qualifying vessels is itself the correct outcome. The
    /// table's "one live row set per config name" invariant rests on this
    /// sequencing, not on a uniqueness constraint.
    pub fn replace_pending_alerts(
        &mut self,
        alert_config_name: &str,
        alerts: &[Alert],
    ) -> Result<()> {
        if alert_config_name.trim().is_empty()
            || alert_config_name.chars().any(char::is_control)
        {
            return Err(StorageError::InvalidConfigName(
                alert_config_name.to_string(),
            ));
        }

        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM pending_alerts WHERE alert_config_name = ?1",
            [alert_config_name],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO pending_alerts (
                     vessel_name, internal_reference_number, external_reference_number,
                     ircs, vessel_identifier, creation_date, value, alert_config_name
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for alert in alerts {
                insert.execute(params![
                    alert.vessel_name,
                    alert.internal_reference_number,
                    alert.external_reference_number,
                    alert.ircs,
                    alert.vessel_identifier.as_str(),
                    alert.creation_date.to_string(),
                    alert.value.to_string(),
                    alert.alert_config_name,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Silenced alerts active at `now`: silencing has started (or has no
    /// start) and has not yet expired.
    pub fn silenced_alerts(&self, now: Timestamp) -> Result<Vec<SilencedAlert>> {
        let mut stmt = self.conn.prepare(
            "SELECT internal_reference_number, external_reference_number, ircs, facade, type
             FROM silenced_alerts
             WHERE silenced_before_date > ?1
               AND (silenced_after_date IS NULL OR silenced_after_date < ?1)",
        )?;

        let rows = stmt.query_map([now.to_string()], |row| {
            Ok(SilencedAlert {
                internal_reference_number: row.get(0)?,
                external_reference_number: row.get(1)?,
                ircs: row.get(2)?,
                facade: row.get(3)?,
                alert_type: row.get(4)?,
            })
        })?;

        rows.map(|r| r.map_err(StorageError::from)).collect()
    }

    /// Distinct identifiable vessels with an at-sea position in the window.
    pub fn vessels_at_sea(&self, from: Timestamp, to: Timestamp) -> Result<Vec<VesselAtRisk>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT
                 p.internal_reference_number, p.external_reference_number, p.ircs,
                 p.vessel_name, p.flag_state, p.facade, r.risk_factor
             FROM positions p
             LEFT JOIN risk_factors r ON r.cfr = p.internal_reference_number
             WHERE p.date_time >= ?1 AND p.date_time < ?2
               AND p.internal_reference_number IS NOT NULL
               AND NOT p.is_at_port",
        )?;

        let rows = stmt.query_map(params![from.to_string(), to.to_string()], |row| {
            Ok(VesselAtRisk {
                internal_reference_number: row.get(0)?,
                external_reference_number: row.get(1)?,
                ircs: row.get(2)?,
                vessel_identifier: VesselIdentifier::InternalReferenceNumber,
                vessel_name: row.get(3)?,
                flag_state: row.get(4)?,
                facade: row.get(5)?,
                risk_factor: row.get(6)?,
                creation_date: None,
            })
        })?;

        rows.map(|r| r.map_err(StorageError::from)).collect()
    }

    /// Reads back every pending alert, reconstructing the type and facade
    /// from the JSON payload; they are not persisted as columns.
    pub fn pending_alerts(&self) -> Result<Vec<Alert>> {
        let mut stmt = self.conn.prepare(
            "SELECT vessel_name, internal_reference_number, external_reference_number,
                    ircs, vessel_identifier, creation_date, value, alert_config_name
             FROM pending_alerts ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut alerts = Vec::new();
        for row in rows {
            let (
                vessel_name,
                internal_reference_number,
                external_reference_number,
                ircs,
                vessel_identifier,
                creation_date,
                value,
                alert_config_name,
            ) = row?;

            let vessel_identifier =
                VesselIdentifier::parse(&vessel_identifier).ok_or_else(|| {
                    StorageError::Corrupt(format!("unknown vessel identifier: {vessel_identifier}"))
                })?;
            let creation_date = creation_date
                .parse::<Timestamp>()
                .map_err(|e| StorageError::Corrupt(format!("invalid creation_date: {e}")))?;
            let value: Value = serde_json::from_str(&value)?;
            let alert_type = value["type"].as_str().unwrap_or_default().to_string();
            let facade = value["seaFront"].as_str().map(String::from);

            alerts.push(Alert {
                vessel_name,
                internal_reference_number,
                external_reference_number,
                ircs,
                vessel_identifier,
                creation_date,
                alert_type,
                facade,
                value,
                alert_config_name,
            });
        }
        Ok(alerts)
    }
}

/// Test seeding for the collaborator tables, which production code only
/// reads.
#[cfg(test)]
impl Storage {
    pub(crate) fn seed_position(
        &self,
        cfr: &str,
        external: &str,
        ircs: &str,
        vessel_name: &str,
        flag_state: &str,
        facade: &str,
        date_time: Timestamp,
        is_at_port: bool,
    ) {
        self.conn
            .execute(
                "INSERT INTO positions (
                     internal_reference_number, external_reference_number, ircs,
                     vessel_name, flag_state, facade, date_time, is_at_port
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    cfr,
                    external,
                    ircs,
                    vessel_name,
                    flag_state,
                    facade,
                    date_time.to_string(),
                    is_at_port,
                ],
            )
            .unwrap();
    }

    pub(crate) fn seed_risk_factor(&self, cfr: &str, risk_factor: f64) {
        self.conn
            .execute(
                "INSERT INTO risk_factors (cfr, risk_factor) VALUES (?1, ?2)",
                params![cfr, risk_factor],
            )
            .unwrap();
    }

    pub(crate) fn seed_silenced_alert(
        &self,
        ircs: &str,
        facade: &str,
        alert_type: &str,
        silenced_before_date: Timestamp,
    ) {
        self.conn
            .execute(
                "INSERT INTO silenced_alerts (ircs, facade, type, silenced_before_date)
                 VALUES (?1, ?2, ?3, ?4)",
                params![ircs, facade, alert_type, silenced_before_date.to_string()],
            )
            .unwrap();
    }
}
