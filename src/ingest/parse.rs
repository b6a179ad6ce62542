//! XML record parser: turn raw messages into logbook report rows.
//!
//! Tag matching is structural, on local names only: XML namespaces encode
//! schema versioning, not semantics, and are discarded uniformly. A parse
//! failure on one message becomes a `ParseError` value and never aborts the
//! rest of the batch.

mod ers3;
pub(super) mod flux;

use jiff::Timestamp;
use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use roxmltree::Node;
use tracing::warn;

use crate::model::{ArchiveEntry, LogbookReport, ParseError, RawMessage, TransmissionFormat};

/// One archive's parse output: the surviving reports, the raw message rows
/// for audit, and the accumulated per-message errors.
#[derive(Debug)]
pub struct ParsedBatch {
    pub entry: ArchiveEntry,
    pub raw_messages: Vec<RawMessage>,
    pub reports: Vec<LogbookReport>,
    pub errors: Vec<ParseError>,
}

/// What one successfully parsed message contributed.
pub(super) struct ParsedMessage {
    pub operation_number: String,
    pub reports: Vec<LogbookReport>,
}

/// Parses every message of an archive, absorbing per-message failures.
///
/// Each successfully parsed message yields exactly one `RawMessage` row and
/// zero or more reports; operation-number ordering within a message is
/// preserved. Failures are recorded with the offending message index.
pub fn parse_batch(entry: &ArchiveEntry, xml_messages: Vec<String>) -> ParsedBatch {
    let mut raw_messages = Vec::new();
    let mut reports = Vec::new();
    let mut errors = Vec::new();

    for (index, xml) in xml_messages.into_iter().enumerate() {
        let parsed = match entry.transmission_format {
            TransmissionFormat::Ers3 => ers3::parse_message(&xml),
            TransmissionFormat::Flux => flux::parse_message(&xml),
        };
        match parsed {
            Ok(message) => {
                raw_messages.push(RawMessage {
                    operation_number: message.operation_number,
                    xml,
                });
                reports.extend(message.reports);
            }
            Err(reason) => errors.push(ParseError {
                archive: entry.file_name.clone(),
                message_index: index,
                reason,
            }),
        }
    }

    ParsedBatch {
        entry: entry.clone(),
        raw_messages,
        reports,
        errors,
    }
}

// ── Shared element helpers ──

/// First child element with the given local name.
pub(super) fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

/// All child elements with the given local name, in document order.
pub(super) fn children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    let tag = tag.to_string();
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

/// Trimmed text of the first child element with the given local name.
pub(super) fn child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    let text = child(node, tag)?.text()?.trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// A non-empty attribute value.
pub(super) fn attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// An attribute that must be present and non-empty.
pub(super) fn required_attr(node: Node<'_, '_>, name: &str) -> Result<String, String> {
    attr(node, name).ok_or_else(|| {
        format!(
            "element <{}> is missing attribute {name}",
            node.tag_name().name()
        )
    })
}

// ── Shared datetime helpers ──

/// Builds a UTC timestamp from an ERS3 date (`2020-12-24`) and optional
/// time (`16:49`). A date alone means midnight. Unparseable values are
/// logged and dropped, matching the per-field tolerance of the dialect.
pub(super) fn parse_ers_datetime(date: Option<&str>, time: Option<&str>) -> Option<Timestamp> {
    let date = date?;
    let parsed = match time {
        Some(time) => DateTime::strptime("%Y-%m-%d %H:%M", format!("{date} {time}")),
        None => Date::strptime("%Y-%m-%d", date).map(|d| d.at(0, 0, 0, 0)),
    };
    match parsed.and_then(|dt| dt.to_zoned(TimeZone::UTC)) {
        Ok(zoned) => Some(zoned.timestamp()),
        Err(e) => {
            warn!(date, time, error = %e, "ERS datetime could not be parsed");
            None
        }
    }
}

/// Parses a FLUX `DateTime` value: RFC 3339, or a naive datetime read as UTC.
pub(super) fn parse_flux_datetime(value: &str) -> Option<Timestamp> {
    if let Ok(ts) = value.parse::<Timestamp>() {
        return Some(ts);
    }
    match DateTime::strptime("%Y-%m-%dT%H:%M:%S", value).and_then(|dt| dt.to_zoned(TimeZone::UTC))
    {
        Ok(zoned) => Some(zoned.timestamp()),
        Err(e) => {
            warn!(value, error = %e, "FLUX datetime could not be parsed");
            None
        }
    }
}

/// Parses a numeric field, tolerating absence and garbage alike.
pub(super) fn try_float(value: Option<String>) -> Option<f64> {
    value.and_then(|v| v.parse().ok())
}
