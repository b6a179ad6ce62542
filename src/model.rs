//! Core data model for Lookout.
//!
//! These types represent the domain: zip archives discovered on the wire,
//! the raw XML messages they carry, the logbook reports parsed from those
//! messages, and the alert records built downstream.

mod alert;
mod archive;
mod report;

pub use alert::{Alert, SilencedAlert, VesselAtRisk, VesselIdentifier};
pub use archive::{ArchiveEntry, ParseError, RawMessage, TransmissionFormat, ZippedFileKind};
pub use report::{Activity, Catch, LogbookReport, OperationCode, VesselIdentity};
