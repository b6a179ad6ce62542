//! Logbook storage: persist parsed reports and their raw messages.

use std::collections::HashSet;

use jiff::Timestamp;
use rusqlite::params;

use crate::model::{Activity, LogbookReport, RawMessage};

use super::{Result, Storage};

impl Storage {
    /// Appends one archive's raw messages and reports in a single
    /// transaction: either the whole archive lands or none of it does.
    pub fn store_reports(
        &mut self,
        raw_messages: &[RawMessage],
        reports: &[LogbookReport],
    ) -> Result<()> {
        let tx = self.conn.transaction()?;

        {
            let mut insert_raw = tx.prepare(
                "INSERT INTO logbook_raw_messages (operation_number, xml_message)
                 VALUES (?1, ?2)",
            )?;
            for message in raw_messages {
                insert_raw.execute(params![message.operation_number, message.xml])?;
            }

            let mut insert_report = tx.prepare(
                "INSERT INTO logbook_reports (
                     operation_number, operation_datetime_utc, operation_type,
                     report_id, referenced_report_id, report_datetime_utc,
                     cfr, ircs, external_identification, vessel_name, flag_state,
                     log_type, value, software, transmission_format
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for report in reports {
                insert_report.execute(params![
                    report.operation_number,
                    report.operation_datetime.map(|t| t.to_string()),
                    report.operation_code.as_str(),
                    report.report_id,
                    report.referenced_report_id,
                    report.report_datetime.map(|t| t.to_string()),
                    report.vessel.cfr,
                    report.vessel.ircs,
                    report.vessel.external_identification,
                    report.vessel.vessel_name,
                    report.vessel.flag_state,
                    report.activity.as_ref().map(Activity::log_type),
                    report.activity.as_ref().map(|a| a.value().to_string()),
                    report.software,
                    report.transmission_format.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Internal reference numbers of vessels whose fishing-operation report
    /// was declared within one window and describes activity within another.
    ///
    /// Declarations trail the activity they describe, so the two windows
    /// are independent.
    pub fn vessels_with_fishing_operations(
        &self,
        declared_from: Timestamp,
        declared_to: Timestamp,
        operated_from: Timestamp,
        operated_to: Timestamp,
    ) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT cfr FROM logbook_reports
             WHERE log_type = 'FAR'
               AND operation_type IN ('DAT', 'COR')
               AND cfr IS NOT NULL
               AND report_datetime_utc >= ?1 AND report_datetime_utc < ?2
               AND json_extract(value, '$.farDatetimeUtc') >= ?3
               AND json_extract(value, '$.farDatetimeUtc') < ?4",
        )?;

        let rows = stmt.query_map(
            params![
                declared_from.to_string(),
                declared_to.to_string(),
                operated_from.to_string(),
                operated_to.to_string(),
            ],
            |row| row.get::<_, String>(0),
        )?;

        let mut vessels = HashSet::new();
        for cfr in rows {
            vessels.insert(cfr?);
        }
        Ok(vessels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{Catch, OperationCode, TransmissionFormat, VesselIdentity};

    fn ts(s: &str) -> Timestamp {
        s.parse().unwrap()
    }

    fn far_report(cfr: &str, declared_at: &str, operated_at: &str) -> LogbookReport {
        LogbookReport {
            operation_number: format!("{cfr}-OP"),
            operation_code: OperationCode::Data,
            operation_datetime: Some(ts(declared_at)),
            transmission_format: TransmissionFormat::Ers3,
            report_id: Some(format!("{cfr}-RN")),
            referenced_report_id: None,
            report_datetime: Some(ts(declared_at)),
            software: None,
            vessel: VesselIdentity {
                cfr: Some(cfr.into()),
                ..VesselIdentity::default()
            },
            activity: Some(Activity::FishingOperation {
                datetime: Some(ts(operated_at)),
                catches: vec![Catch {
                    species: Some("COD".into()),
                    weight: Some(100.0),
                    count: None,
                }],
            }),
        }
    }

    fn raw(operation_number: &str) -> RawMessage {
        RawMessage {
            operation_number: operation_number.into(),
            xml: "<OPS/>".into(),
        }
    }

    #[test]
    fn store_reports_persists_both_tables() {
        let mut storage = Storage::open_in_memory().unwrap();
        let reports = vec![far_report(
            "ABC000306959",
            "2018-07-22T10:00:00Z",
            "2018-07-21T14:00:00Z",
        )];

        storage
            .store_reports(&[raw("ABC000306959-OP")], &reports)
            .unwrap();

        let report_count: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM logbook_reports", [], |r| r.get(0))
            .unwrap();
        let raw_count: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM logbook_raw_messages", [], |r| r.get(0))
            .unwrap();
        assert_eq!(report_count, 1);
        assert_eq!(raw_count, 1);

        let (op_type, log_type, format): (String, String, String) = storage
            .conn
            .query_row(
                "SELECT operation_type, log_type, transmission_format FROM logbook_reports",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(op_type, "DAT");
        assert_eq!(log_type, "FAR");
        assert_eq!(format, "ERS3");
    }

    #[test]
    fn fishing_operation_lookup_respects_both_windows() {
        let mut storage = Storage::open_in_memory().unwrap();
        storage
            .store_reports(
                &[],
                &[
                    // Declared and operated inside the windows below.
                    far_report(
                        "ABC000306959",
                        "2018-07-22T10:00:00Z",
                        "2018-07-21T14:00:00Z",
                    ),
                    // Operated too early.
                    far_report(
                        "ABC000542519",
                        "2018-07-22T11:00:00Z",
                        "2018-07-10T09:00:00Z",
                    ),
                    // Declared too late.
                    far_report(
                        "DEF000123456",
                        "2018-08-01T08:00:00Z",
                        "2018-07-21T16:00:00Z",
                    ),
                ],
            )
            .unwrap();

        let vessels = storage
            .vessels_with_fishing_operations(
                ts("2018-07-22T00:00:00Z"),
                ts("2018-07-23T00:00:00Z"),
                ts("2018-07-21T00:00:00Z"),
                ts("2018-07-22T00:00:00Z"),
            )
            .unwrap();

        assert_eq!(vessels, HashSet::from(["ABC000306959".to_string()]));
    }

    #[test]
    fn reports_without_activity_do_not_count_as_fishing_operations() {
        let mut storage = Storage::open_in_memory().unwrap();
        let mut report = far_report(
            "GHI000999999",
            "2018-07-22T10:00:00Z",
            "2018-07-21T14:00:00Z",
        );
        report.activity = None;
        report.operation_code = OperationCode::Delete;
        storage.store_reports(&[], &[report]).unwrap();

        let vessels = storage
            .vessels_with_fishing_operations(
                ts("2018-07-22T00:00:00Z"),
                ts("2018-07-23T00:00:00Z"),
                ts("2018-07-21T00:00:00Z"),
                ts("2018-07-22T00:00:00Z"),
            )
            .unwrap();

        assert!(vessels.is_empty());
    }
}
