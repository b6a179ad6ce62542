//! Alert types: vessels meeting an alert condition, and the silenced
//! alerts that suppress them.

use jiff::Timestamp;
use serde_json::Value;

/// Which of the three vessel identifier keys identifies this vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VesselIdentifier {
    InternalReferenceNumber,
    ExternalReferenceNumber,
    Ircs,
}

impl VesselIdentifier {
    /// The token persisted in the `vessel_identifier` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InternalReferenceNumber => "INTERNAL_REFERENCE_NUMBER",
            Self::ExternalReferenceNumber => "EXTERNAL_REFERENCE_NUMBER",
            Self::Ircs => "IRCS",
        }
    }

    /// The inverse of [`Self::as_str`], for rows read back from storage.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INTERNAL_REFERENCE_NUMBER" => Some(Self::InternalReferenceNumber),
            "EXTERNAL_REFERENCE_NUMBER" => Some(Self::ExternalReferenceNumber),
            "IRCS" => Some(Self::Ircs),
            _ => None,
        }
    }
}

/// A vessel meeting an alert condition. Input to the alert builder.
///
/// Any of the three identifier keys may be absent; `vessel_identifier`
/// names the one that authoritatively identifies the vessel.
#[derive(Debug, Clone)]
pub struct VesselAtRisk {
    pub internal_reference_number: Option<String>,
    pub external_reference_number: Option<String>,
    pub ircs: Option<String>,
    pub vessel_identifier: VesselIdentifier,
    pub vessel_name: Option<String>,
    pub facade: Option<String>,
    pub flag_state: Option<String>,
    pub risk_factor: Option<f64>,
    pub creation_date: Option<Timestamp>,
}

/// A denormalized alert row, shaped for the `pending_alerts` table.
///
/// `value` is derived deterministically from (facade, flag state, type,
/// risk factor) and round-trips through JSON. `alert_type` and `facade`
/// are kept as fields for the silencing join; only `value` carries them
/// into storage.
#[derive(Debug, Clone)]
pub struct Alert {
    pub vessel_name: Option<String>,
    pub internal_reference_number: Option<String>,
    pub external_reference_number: Option<String>,
    pub ircs: Option<String>,
    pub vessel_identifier: VesselIdentifier,
    pub creation_date: Timestamp,
    pub alert_type: String,
    pub facade: Option<String>,
    pub value: Value,
    pub alert_config_name: String,
}

impl Alert {
    /// True when at least one of the three identifier keys is present on
    /// both sides and equal.
    pub fn shares_identifier(&self, silenced: &SilencedAlert) -> bool {
        key_matches(
            self.internal_reference_number.as_deref(),
            silenced.internal_reference_number.as_deref(),
        ) || key_matches(
            self.external_reference_number.as_deref(),
            silenced.external_reference_number.as_deref(),
        ) || key_matches(self.ircs.as_deref(), silenced.ircs.as_deref())
    }
}

fn key_matches(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

/// A previously acknowledged alert, used only as a filter key set.
#[derive(Debug, Clone)]
pub struct SilencedAlert {
    pub internal_reference_number: Option<String>,
    pub external_reference_number: Option<String>,
    pub ircs: Option<String>,
    pub facade: Option<String>,
    pub alert_type: String,
}
