//! FLUX dialect: UN/CEFACT `FLUXFAReportMessage` documents.
//!
//! One message carries an envelope-level `FLUXReportDocument` and any
//! number of `FAReportDocument` children, each of which becomes one report
//! row. Purpose codes map onto the ERS3 operation vocabulary, and activity
//! type codes onto the canonical log types, so both dialects produce the
//! same record shape.

use base64::prelude::{BASE64_STANDARD, Engine as _};
use roxmltree::{Document, Node};
use serde_json::json;

use crate::model::{
    Activity, Catch, LogbookReport, OperationCode, TransmissionFormat, VesselIdentity,
};

use super::{ParsedMessage, child, child_text, children, parse_flux_datetime, try_float};

/// Unwraps a FLUX transport envelope, if the document is one.
///
/// Returns `Ok(None)` when the text is not a well-formed `BUSINESS`
/// envelope, including when it is not well-formed XML at all, in which
/// case the record parser owns the failure. A recognizable envelope with a
/// missing or undecodable payload is an error here: there is no document
/// to hand on.
pub(crate) fn unwrap_envelope(xml: &str) -> Result<Option<String>, String> {
    let Ok(doc) = Document::parse(xml) else {
        return Ok(None);
    };
    let root = doc.root_element();
    if root.tag_name().name() != "BUSINESS" {
        return Ok(None);
    }

    let payload = root
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "Payload")
        .ok_or("business envelope has no Payload element")?;

    let encoded: String = payload
        .text()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if encoded.is_empty() {
        return Err("business envelope Payload is empty".to_string());
    }

    let bytes = BASE64_STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| format!("invalid base64 payload: {e}"))?;
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|_| "decoded payload is not valid UTF-8".to_string())
}

pub(in crate::ingest) fn parse_message(xml: &str) -> Result<ParsedMessage, String> {
    // The extractor unwraps envelopes from archives, but messages replayed
    // from storage may still be wrapped.
    let unwrapped = unwrap_envelope(xml)?;
    let text = unwrapped.as_deref().unwrap_or(xml);

    let doc = Document::parse(text).map_err(|e| format!("malformed XML: {e}"))?;
    let root = doc.root_element();
    if root.tag_name().name() != "FLUXFAReportMessage" {
        return Err(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        ));
    }

    let flux_doc = child(root, "FLUXReportDocument").ok_or("missing FLUXReportDocument")?;
    let operation_number = child_text(flux_doc, "ID").ok_or("FLUXReportDocument has no ID")?;
    let operation_datetime = child(flux_doc, "CreationDateTime")
        .and_then(|n| child_text(n, "DateTime"))
        .and_then(|s| parse_flux_datetime(&s));
    let envelope_purpose = child_text(flux_doc, "PurposeCode");

    let mut reports = Vec::new();
    for fa in children(root, "FAReportDocument") {
        reports.push(parse_fa_report(
            fa,
            &operation_number,
            operation_datetime,
            envelope_purpose.as_deref(),
        )?);
    }

    Ok(ParsedMessage {
        operation_number,
        reports,
    })
}

fn parse_fa_report(
    fa: Node<'_, '_>,
    operation_number: &str,
    operation_datetime: Option<jiff::Timestamp>,
    envelope_purpose: Option<&str>,
) -> Result<LogbookReport, String> {
    let related = child(fa, "RelatedFLUXReportDocument");
    let report_id = related.and_then(|r| child_text(r, "ID"));
    let referenced_report_id = related.and_then(|r| child_text(r, "ReferencedID"));

    let purpose = related
        .and_then(|r| child_text(r, "PurposeCode"))
        .or_else(|| envelope_purpose.map(String::from))
        .ok_or("FAReportDocument has no PurposeCode")?;
    let operation_code = OperationCode::from_flux_purpose(&purpose)
        .ok_or_else(|| format!("unknown PurposeCode {purpose}"))?;

    let report_datetime = child(fa, "AcceptanceDateTime")
        .and_then(|n| child_text(n, "DateTime"))
        .and_then(|s| parse_flux_datetime(&s));

    let vessel = child(fa, "SpecifiedVesselTransportMeans")
        .map(parse_vessel)
        .unwrap_or_default();
    let activity = child(fa, "SpecifiedFishingActivity").map(parse_activity);

    Ok(LogbookReport {
        operation_number: operation_number.to_string(),
        operation_code,
        operation_datetime,
        transmission_format: TransmissionFormat::Flux,
        report_id,
        referenced_report_id,
        report_datetime,
        software: None,
        vessel,
        activity,
    })
}

/// Vessel identity from `ID` elements discriminated by `schemeID`.
fn parse_vessel(means: Node<'_, '_>) -> VesselIdentity {
    let mut vessel = VesselIdentity {
        vessel_name: child_text(means, "Name"),
        flag_state: child(means, "RegistrationVesselCountry").and_then(|c| child_text(c, "ID")),
        ..VesselIdentity::default()
    };

    for id in children(means, "ID") {
        let Some(value) = id.text().map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        match id.attribute("schemeID") {
            Some("CFR") => vessel.cfr = Some(value.to_string()),
            Some("IRCS") => vessel.ircs = Some(value.to_string()),
            Some("EXT_MARK") => vessel.external_identification = Some(value.to_string()),
            _ => {}
        }
    }

    vessel
}

fn parse_activity(activity: Node<'_, '_>) -> Activity {
    let type_code = child_text(activity, "TypeCode").unwrap_or_default();
    let occurrence = child(activity, "OccurrenceDateTime")
        .and_then(|n| child_text(n, "DateTime"))
        .and_then(|s| parse_flux_datetime(&s));
    let port = children(activity, "RelatedFLUXLocation")
        .find_map(|loc| child_text(loc, "ID"));
    let catches: Vec<Catch> = children(activity, "SpecifiedFACatch")
        .map(|c| Catch {
            species: child_text(c, "SpeciesCode"),
            weight: try_float(child_text(c, "WeightMeasure")),
            count: try_float(child_text(c, "UnitQuantity")),
        })
        .collect();

    match type_code.as_str() {
        "DEPARTURE" => Activity::Departure {
            datetime: occurrence,
            port,
            anticipated_activity: child_text(activity, "ReasonCode"),
        },
        "FISHING_OPERATION" => Activity::FishingOperation {
            datetime: occurrence,
            catches,
        },
        "DISCARD" => Activity::Discard {
            datetime: occurrence,
            catches,
        },
        "PRIOR_NOTIFICATION_OF_ARRIVAL" => Activity::PriorNotification {
            datetime: None,
            estimated_arrival: occurrence,
            port,
        },
        "ARRIVAL" => Activity::Return {
            datetime: occurrence,
            port,
            reason: child_text(activity, "ReasonCode"),
        },
        "LANDING" => Activity::Landing {
            datetime: occurrence,
            catches,
        },
        code => Activity::Other {
            code: code.to_string(),
            attributes: json!({
                "occurrenceDatetimeUtc": occurrence.map(|t| t.to_string()),
                "port": port,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARRIVAL_DOCUMENT: &str = r#"<rsm:FLUXFAReportMessage xmlns:rsm="urn:un:unece:uncefact:data:standard:FLUXFAReportMessage:3">
  <rsm:FLUXReportDocument>
    <rsm:ID schemeID="UUID">7f1357b6-2b47-4183-8380-e39bf8424abc</rsm:ID>
    <rsm:CreationDateTime><rsm:DateTime>2020-05-07T06:01:10Z</rsm:DateTime></rsm:CreationDateTime>
    <rsm:PurposeCode listID="FLUX_GP_PURPOSE">9</rsm:PurposeCode>
  </rsm:FLUXReportDocument>
  <rsm:FAReportDocument>
    <rsm:TypeCode listID="FLUX_FA_REPORT_TYPE">DECLARATION</rsm:TypeCode>
    <rsm:RelatedFLUXReportDocument>
      <rsm:ID schemeID="UUID">c2b31837-69f0-4fdf-92a9-b25ff124f781</rsm:ID>
      <rsm:PurposeCode listID="FLUX_GP_PURPOSE">9</rsm:PurposeCode>
    </rsm:RelatedFLUXReportDocument>
    <rsm:SpecifiedFishingActivity>
      <rsm:TypeCode listID="FLUX_FA_TYPE">ARRIVAL</rsm:TypeCode>
      <rsm:OccurrenceDateTime><rsm:DateTime>2020-05-07T05:43:00Z</rsm:DateTime></rsm:OccurrenceDateTime>
      <rsm:RelatedFLUXLocation><rsm:ID schemeID="LOCATION">NLVLI</rsm:ID></rsm:RelatedFLUXLocation>
    </rsm:SpecifiedFishingActivity>
    <rsm:SpecifiedVesselTransportMeans>
      <rsm:ID schemeID="CFR">NLD000312342</rsm:ID>
      <rsm:ID schemeID="EXT_MARK">VLI-2342</rsm:ID>
      <rsm:RegistrationVesselCountry><rsm:ID schemeID="TERRITORY">NLD</rsm:ID></rsm:RegistrationVesselCountry>
    </rsm:SpecifiedVesselTransportMeans>
  </rsm:FAReportDocument>
</rsm:FLUXFAReportMessage>"#;

    #[test]
    fn envelope_and_direct_document_parse_to_the_same_report() {
        let envelope = format!(
            "<BUSINESS><HEADER/><PostMsg><Payload>{}</Payload></PostMsg></BUSINESS>",
            BASE64_STANDARD.encode(ARRIVAL_DOCUMENT)
        );

        let direct = parse_message(ARRIVAL_DOCUMENT).unwrap();
        let wrapped = parse_message(&envelope).unwrap();

        assert_eq!(direct.operation_number, wrapped.operation_number);
        assert_eq!(direct.reports, wrapped.reports);
    }

    #[test]
    fn unwrap_passes_non_envelope_documents_through() {
        assert_eq!(unwrap_envelope(ARRIVAL_DOCUMENT).unwrap(), None);
        // Not XML at all: the record parser owns this failure.
        assert_eq!(unwrap_envelope("garbage").unwrap(), None);
    }

    #[test]
    fn unwrap_rejects_an_envelope_without_a_usable_payload() {
        let missing = "<BUSINESS><HEADER/></BUSINESS>";
        assert!(unwrap_envelope(missing).is_err());

        let not_base64 = "<BUSINESS><Payload>!!not base64!!</Payload></BUSINESS>";
        assert!(unwrap_envelope(not_base64).is_err());
    }

    #[test]
    fn base64_payload_may_contain_whitespace() {
        let encoded = BASE64_STANDARD.encode(ARRIVAL_DOCUMENT);
        let (head, tail) = encoded.split_at(40);
        let envelope = format!("<BUSINESS><Payload>\n  {head}\n  {tail}\n</Payload></BUSINESS>");

        let unwrapped = unwrap_envelope(&envelope).unwrap();
        assert_eq!(unwrapped.as_deref(), Some(ARRIVAL_DOCUMENT));
    }

    #[test]
    fn vessel_identifiers_follow_their_scheme_ids() {
        let message = parse_message(ARRIVAL_DOCUMENT).unwrap();
        let vessel = &message.reports[0].vessel;

        assert_eq!(vessel.cfr.as_deref(), Some("NLD000312342"));
        assert_eq!(vessel.external_identification.as_deref(), Some("VLI-2342"));
        assert!(vessel.ircs.is_none());
        assert_eq!(vessel.flag_state.as_deref(), Some("NLD"));
    }

    #[test]
    fn correction_purpose_maps_to_the_correction_code() {
        let xml = ARRIVAL_DOCUMENT.replace(
            r#"<rsm:PurposeCode listID="FLUX_GP_PURPOSE">9</rsm:PurposeCode>
    </rsm:RelatedFLUXReportDocument>"#,
            r#"<rsm:PurposeCode listID="FLUX_GP_PURPOSE">5</rsm:PurposeCode>
      <rsm:ReferencedID schemeID="UUID">0de4a783-c410-4db6-8f16-34b6bbce9e3a</rsm:ReferencedID>
    </rsm:RelatedFLUXReportDocument>"#,
        );

        let message = parse_message(&xml).unwrap();
        let report = &message.reports[0];

        assert_eq!(report.operation_code, OperationCode::Correction);
        assert_eq!(
            report.referenced_report_id.as_deref(),
            Some("0de4a783-c410-4db6-8f16-34b6bbce9e3a")
        );
    }

    #[test]
    fn a_message_with_no_fa_report_documents_yields_no_reports() {
        let xml = r#"<rsm:FLUXFAReportMessage xmlns:rsm="urn:x">
          <rsm:FLUXReportDocument>
            <rsm:ID schemeID="UUID">11111111-2222-3333-4444-555555555555</rsm:ID>
            <rsm:PurposeCode>9</rsm:PurposeCode>
          </rsm:FLUXReportDocument>
        </rsm:FLUXFAReportMessage>"#;

        let message = parse_message(xml).unwrap();
        assert!(message.reports.is_empty());
        assert_eq!(
            message.operation_number,
            "11111111-2222-3333-4444-555555555555"
        );
    }
}
