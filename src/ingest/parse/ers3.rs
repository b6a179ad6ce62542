//! ERS3 dialect: one `OPS` element per message, attribute-encoded fields.
//!
//! The operation child of `OPS` declares the message kind. `DAT` and `COR`
//! carry an `ERS` report whose `LOG` batches the vessel's declarations;
//! each declaration element becomes one report row. The remaining kinds
//! (`DEL`, `RET`, `RSP`, `QUE`) reference other reports and yield a single
//! row apiece.

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use crate::model::{
    Activity, Catch, LogbookReport, OperationCode, TransmissionFormat, VesselIdentity,
};

use super::{
    ParsedMessage, attr, child, children, parse_ers_datetime, required_attr, try_float,
};

pub(in crate::ingest) fn parse_message(xml: &str) -> Result<ParsedMessage, String> {
    let doc = Document::parse(xml).map_err(|e| format!("malformed XML: {e}"))?;
    let ops = doc.root_element();
    if ops.tag_name().name() != "OPS" {
        return Err(format!(
            "unexpected root element <{}>",
            ops.tag_name().name()
        ));
    }

    let operation_number = required_attr(ops, "ON")?;
    let operation_datetime = parse_ers_datetime(ops.attribute("OD"), ops.attribute("OT"));
    let software = attr(ops, "EVL");

    let operation = ops
        .children()
        .find(Node::is_element)
        .ok_or("OPS element has no operation child")?;
    let tag = operation.tag_name().name();
    let operation_code = OperationCode::from_ers3_tag(tag)
        .ok_or_else(|| format!("unknown operation element <{tag}>"))?;

    // Everything below shares the operation header; only the body varies.
    let base = LogbookReport {
        operation_number: operation_number.clone(),
        operation_code,
        operation_datetime,
        transmission_format: TransmissionFormat::Ers3,
        report_id: None,
        referenced_report_id: None,
        report_datetime: None,
        software,
        vessel: VesselIdentity::default(),
        activity: None,
    };

    let reports = match operation_code {
        OperationCode::Data | OperationCode::Correction => parse_declarations(operation, &base)?,
        OperationCode::Delete => vec![LogbookReport {
            referenced_report_id: attr(operation, "RN"),
            ..base
        }],
        OperationCode::Retraction => vec![LogbookReport {
            referenced_report_id: attr(operation, "ON"),
            activity: Some(Activity::Other {
                code: "RET".into(),
                attributes: return_status(operation),
            }),
            ..base
        }],
        OperationCode::Response | OperationCode::Query => vec![base],
    };

    Ok(ParsedMessage {
        operation_number,
        reports,
    })
}

/// Expands a `DAT` or `COR` operation into one report per declaration.
fn parse_declarations(
    operation: Node<'_, '_>,
    base: &LogbookReport,
) -> Result<Vec<LogbookReport>, String> {
    let ers = child(operation, "ERS").ok_or("DAT/COR operation has no ERS element")?;
    let report_id = attr(ers, "RN");
    let report_datetime = parse_ers_datetime(ers.attribute("RD"), ers.attribute("RT"));
    // A correction names the report it supersedes on the operation element.
    let referenced_report_id = attr(operation, "RN");

    let Some(log) = child(ers, "LOG") else {
        return Ok(vec![LogbookReport {
            report_id,
            referenced_report_id,
            report_datetime,
            ..base.clone()
        }]);
    };

    let vessel = VesselIdentity {
        cfr: attr(log, "IR"),
        ircs: attr(log, "RC"),
        external_identification: attr(log, "XR"),
        vessel_name: attr(log, "NA"),
        flag_state: attr(log, "FS"),
    };

    let declarations: Vec<Activity> = log
        .children()
        .filter(Node::is_element)
        .map(parse_declaration)
        .collect();

    // A LOG with no declarations still records the vessel's report.
    if declarations.is_empty() {
        return Ok(vec![LogbookReport {
            report_id,
            referenced_report_id,
            report_datetime,
            vessel,
            ..base.clone()
        }]);
    }

    Ok(declarations
        .into_iter()
        .map(|activity| LogbookReport {
            report_id: report_id.clone(),
            referenced_report_id: referenced_report_id.clone(),
            report_datetime,
            vessel: vessel.clone(),
            activity: Some(activity),
            ..base.clone()
        })
        .collect())
}

fn parse_declaration(el: Node<'_, '_>) -> Activity {
    let datetime = parse_ers_datetime(el.attribute("DA"), el.attribute("TI"));
    match el.tag_name().name() {
        "DEP" => Activity::Departure {
            datetime,
            port: attr(el, "PO"),
            anticipated_activity: attr(el, "AA"),
        },
        "FAR" => Activity::FishingOperation {
            datetime,
            catches: species_catches(el),
        },
        "DIS" => Activity::Discard {
            datetime,
            catches: species_catches(el),
        },
        "PNO" => Activity::PriorNotification {
            datetime,
            estimated_arrival: parse_ers_datetime(el.attribute("PD"), el.attribute("PT")),
            port: attr(el, "PO"),
        },
        "RTP" => Activity::Return {
            datetime,
            port: attr(el, "PO"),
            reason: attr(el, "RE"),
        },
        "LAN" => Activity::Landing {
            datetime,
            catches: species_catches(el),
        },
        "EOF" => Activity::EndOfFishing { datetime },
        code => Activity::Other {
            code: code.to_string(),
            attributes: raw_attributes(el),
        },
    }
}

/// `SPE` children of a declaration: species, live weight, unit count.
fn species_catches(el: Node<'_, '_>) -> Vec<Catch> {
    children(el, "SPE")
        .map(|spe| Catch {
            species: attr(spe, "SN"),
            weight: try_float(attr(spe, "WT")),
            count: try_float(attr(spe, "NB")),
        })
        .collect()
}

fn return_status(operation: Node<'_, '_>) -> Value {
    let mut map = Map::new();
    map.insert(
        "returnStatus".into(),
        attr(operation, "RS").map_or(Value::Null, Value::String),
    );
    Value::Object(map)
}

/// A declaration code we do not model: keep its attributes verbatim.
fn raw_attributes(el: Node<'_, '_>) -> Value {
    let map: Map<String, Value> = el
        .attributes()
        .map(|a| (a.name().to_string(), Value::String(a.value().to_string())))
        .collect();
    Value::Object(map)
}
