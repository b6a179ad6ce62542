//! Logbook report types: one structured activity record per declaration.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::archive::TransmissionFormat;

/// The role of an operation on the wire.
///
/// The ERS3 tokens are canonical; FLUX purpose codes map onto the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationCode {
    /// A new declaration (`DAT`).
    Data,
    /// A correction of an earlier report (`COR`).
    Correction,
    /// A deletion of an earlier report (`DEL`).
    Delete,
    /// An acknowledgement returned by the hub (`RET`).
    Retraction,
    /// Protocol response (`RSP`).
    Response,
    /// Protocol query (`QUE`).
    Query,
}

impl OperationCode {
    /// The ERS3 wire token, also used as the persisted text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "DAT",
            Self::Correction => "COR",
            Self::Delete => "DEL",
            Self::Retraction => "RET",
            Self::Response => "RSP",
            Self::Query => "QUE",
        }
    }

    /// Maps an ERS3 operation element tag to its code.
    pub fn from_ers3_tag(tag: &str) -> Option<Self> {
        match tag {
            "DAT" => Some(Self::Data),
            "COR" => Some(Self::Correction),
            "DEL" => Some(Self::Delete),
            "RET" => Some(Self::Retraction),
            "RSP" => Some(Self::Response),
            "QUE" => Some(Self::Query),
            _ => None,
        }
    }

    /// Maps a FLUX `PurposeCode` to its code.
    ///
    /// FLUX has no response/query purposes; those arrive as distinct
    /// message kinds, not report purposes.
    pub fn from_flux_purpose(purpose: &str) -> Option<Self> {
        match purpose {
            "9" => Some(Self::Data),
            "5" => Some(Self::Correction),
            "3" => Some(Self::Delete),
            "1" => Some(Self::Retraction),
            _ => None,
        }
    }

    /// Request/acknowledgement chatter with no persisted business meaning.
    pub fn is_protocol_noise(self) -> bool {
        matches!(self, Self::Response | Self::Query)
    }
}

/// Vessel identity as declared on a report. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VesselIdentity {
    pub cfr: Option<String>,
    pub ircs: Option<String>,
    pub external_identification: Option<String>,
    pub vessel_name: Option<String>,
    pub flag_state: Option<String>,
}

/// One species caught, discarded, or landed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catch {
    pub species: Option<String>,
    /// Live weight in kilograms.
    pub weight: Option<f64>,
    /// Number of fish, for species counted by unit.
    pub count: Option<f64>,
}

/// The declared activity carried by a report, keyed by canonical log type.
///
/// FLUX activity types are normalized onto the same variants as ERS3
/// declarations, so downstream consumers see one vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    /// Departure from port (`DEP`).
    Departure {
        datetime: Option<Timestamp>,
        port: Option<String>,
        anticipated_activity: Option<String>,
    },

    /// Fishing activity report (`FAR`), one per fishing day or haul.
    FishingOperation {
        datetime: Option<Timestamp>,
        catches: Vec<Catch>,
    },

    /// Discard declaration (`DIS`).
    Discard {
        datetime: Option<Timestamp>,
        catches: Vec<Catch>,
    },

    /// Prior notification of return to port (`PNO`).
    PriorNotification {
        datetime: Option<Timestamp>,
        estimated_arrival: Option<Timestamp>,
        port: Option<String>,
    },

    /// Return to port (`RTP`).
    Return {
        datetime: Option<Timestamp>,
        port: Option<String>,
        reason: Option<String>,
    },

    /// Landing declaration (`LAN`).
    Landing {
        datetime: Option<Timestamp>,
        catches: Vec<Catch>,
    },

    /// End of fishing (`EOF`).
    EndOfFishing { datetime: Option<Timestamp> },

    /// A dialect code not modeled above, kept with its raw attributes.
    Other { code: String, attributes: Value },
}

impl Activity {
    /// The canonical log-type code persisted alongside the value.
    pub fn log_type(&self) -> &str {
        match self {
            Self::Departure { .. } => "DEP",
            Self::FishingOperation { .. } => "FAR",
            Self::Discard { .. } => "DIS",
            Self::PriorNotification { .. } => "PNO",
            Self::Return { .. } => "RTP",
            Self::Landing { .. } => "LAN",
            Self::EndOfFishing { .. } => "EOF",
            Self::Other { code, .. } => code,
        }
    }

    /// The JSON payload persisted in the `value` column.
    pub fn value(&self) -> Value {
        match self {
            Self::Departure {
                datetime,
                port,
                anticipated_activity,
            } => json!({
                "departureDatetimeUtc": timestamp_json(datetime),
                "departurePort": port,
                "anticipatedActivity": anticipated_activity,
            }),
            Self::FishingOperation { datetime, catches } => json!({
                "farDatetimeUtc": timestamp_json(datetime),
                "catches": catches,
            }),
            Self::Discard { datetime, catches } => json!({
                "discardDatetimeUtc": timestamp_json(datetime),
                "catches": catches,
            }),
            Self::PriorNotification {
                datetime,
                estimated_arrival,
                port,
            } => json!({
                "pnoDatetimeUtc": timestamp_json(datetime),
                "predictedArrivalDatetimeUtc": timestamp_json(estimated_arrival),
                "port": port,
            }),
            Self::Return {
                datetime,
                port,
                reason,
            } => json!({
                "returnDatetimeUtc": timestamp_json(datetime),
                "port": port,
                "reasonOfReturn": reason,
            }),
            Self::Landing { datetime, catches } => json!({
                "landingDatetimeUtc": timestamp_json(datetime),
                "catches": catches,
            }),
            Self::EndOfFishing { datetime } => json!({
                "endOfFishingDatetimeUtc": timestamp_json(datetime),
            }),
            Self::Other { attributes, .. } => attributes.clone(),
        }
    }
}

fn timestamp_json(ts: &Option<Timestamp>) -> Value {
    match ts {
        Some(ts) => Value::String(ts.to_string()),
        None => Value::Null,
    }
}

/// One structured activity record extracted from a message.
///
/// Belongs to exactly one raw message and carries that message's
/// transmission format. The operation number is monotonic per originating
/// message, not globally unique.
#[derive(Debug, Clone, PartialEq)]
pub struct LogbookReport {
    pub operation_number: String,
    pub operation_code: OperationCode,
    pub operation_datetime: Option<Timestamp>,
    pub transmission_format: TransmissionFormat,
    pub report_id: Option<String>,
    pub referenced_report_id: Option<String>,
    pub report_datetime: Option<Timestamp>,
    pub software: Option<String>,
    pub vessel: VesselIdentity,
    pub activity: Option<Activity>,
}
