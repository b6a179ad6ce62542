//! Reconciliation filter: drop protocol chatter before anything persists.
//!
//! Response and query operations are request/acknowledgement traffic with
//! no business meaning; they must never reach storage. This is a pure,
//! order-preserving filter: corrections, deletions, and retractions stay
//! as separate rows for downstream consumers to interpret.

use crate::model::LogbookReport;

/// A report paired with the raw XML of its originating message.
#[derive(Debug, Clone)]
pub struct ReportWithXml {
    pub report: LogbookReport,
    pub xml: String,
}

/// The two report views produced upstream, both needing the same filter.
#[derive(Debug, Clone, Default)]
pub struct ReportViews {
    pub parsed: Option<Vec<LogbookReport>>,
    pub parsed_with_xml: Option<Vec<ReportWithXml>>,
}

/// Removes response/query rows from each non-null view.
///
/// `None` passes through as `None`; idempotent.
pub fn clean(views: Option<ReportViews>) -> Option<ReportViews> {
    views.map(|views| ReportViews {
        parsed: views.parsed.map(|reports| {
            reports
                .into_iter()
                .filter(|r| !r.operation_code.is_protocol_noise())
                .collect()
        }),
        parsed_with_xml: views.parsed_with_xml.map(|rows| {
            rows.into_iter()
                .filter(|r| !r.report.operation_code.is_protocol_noise())
                .collect()
        }),
    })
}
